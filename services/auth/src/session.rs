//! Session cookie handling
//!
//! The session token travels in the `token` cookie. This module builds the
//! cookie when a session starts and the removal cookie when it ends.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Name of the cookie holding the session token
pub const TOKEN_COOKIE: &str = "token";

/// Attributes applied to session cookies
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    /// Cookie lifetime in seconds, matching the token lifetime
    pub max_age_secs: u64,
    /// Only send the cookie over HTTPS
    pub secure: bool,
}

impl CookieSettings {
    /// Cookie carrying a freshly issued session token
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let max_age = i64::try_from(self.max_age_secs).unwrap_or(i64::MAX);

        Cookie::build((TOKEN_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(max_age))
            .build()
    }
}

/// Add the session cookie for `token` to the jar
pub fn start_session(jar: CookieJar, settings: &CookieSettings, token: String) -> CookieJar {
    jar.add(settings.session_cookie(token))
}

/// Expire the session cookie
pub fn end_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((TOKEN_COOKIE, "")).path("/").build())
}

/// The session token carried by the request, if any
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let settings = CookieSettings {
            max_age_secs: 3600,
            secure: true,
        };
        let cookie = settings.session_cookie("abc".to_string());

        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
    }

    #[test]
    fn test_session_token_ignores_blank_cookie() {
        let jar = CookieJar::new().add(Cookie::new(TOKEN_COOKIE, "  "));
        assert_eq!(session_token(&jar), None);

        let jar = CookieJar::new().add(Cookie::new(TOKEN_COOKIE, "abc"));
        assert_eq!(session_token(&jar).as_deref(), Some("abc"));
    }

    #[test]
    fn test_end_session_drops_cookie() {
        let jar = CookieJar::new().add(Cookie::new(TOKEN_COOKIE, "abc"));
        let jar = end_session(jar);
        assert!(jar.get(TOKEN_COOKIE).is_none());
    }
}
