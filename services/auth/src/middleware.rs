//! Middleware for page guarding and API session validation

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    TypedHeader,
    extract::CookieJar,
    headers::{Authorization, authorization::Bearer},
};
use tracing::{debug, warn};

use crate::{AppState, error::AuthError, session};

/// Path prefixes whose pages require a session cookie
#[derive(Debug, Clone)]
pub struct RouteGuard {
    prefixes: Vec<String>,
    login_path: String,
}

impl RouteGuard {
    /// Create a guard for `prefixes`, sending anonymous visitors to `login_path`
    pub fn new(prefixes: Vec<String>, login_path: impl Into<String>) -> Self {
        Self {
            prefixes,
            login_path: login_path.into(),
        }
    }

    /// Whether `path` is a protected prefix or lies beneath one
    pub fn is_protected(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Where anonymous visitors are sent
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// The redirect every page uses to send a visitor to the login page
    pub fn login_redirect(&self) -> Redirect {
        Redirect::temporary(&self.login_path)
    }
}

/// Redirect requests for protected pages that carry no `token` cookie.
///
/// Only the cookie's presence is checked; the pages themselves validate the
/// token.
pub async fn route_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();

    if state.route_guard.is_protected(path) && session::session_token(&jar).is_none() {
        warn!("No session cookie for protected path {}", path);
        return state.route_guard.login_redirect().into_response();
    }

    next.run(req).await
}

/// Validate the session token of an API request and expose its claims.
///
/// The token is taken from `Authorization: Bearer` first, then from the
/// `token` cookie.
pub async fn require_session(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer
        .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
        .or_else(|| session::session_token(&jar))
        .ok_or(AuthError::Unauthorized)?;

    let claims = state.jwt_service.validate_token(&token).map_err(|e| {
        debug!("Rejected session token: {}", e);
        AuthError::Unauthorized
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> RouteGuard {
        RouteGuard::new(
            vec![
                "/admin".to_string(),
                "/profile".to_string(),
                "/dashboard".to_string(),
            ],
            "/login",
        )
    }

    #[test]
    fn test_protected_paths() {
        let guard = guard();

        assert!(guard.is_protected("/admin"));
        assert!(guard.is_protected("/admin/users"));
        assert!(guard.is_protected("/profile/"));
        assert!(guard.is_protected("/dashboard"));
    }

    #[test]
    fn test_unprotected_paths() {
        let guard = guard();

        assert!(!guard.is_protected("/"));
        assert!(!guard.is_protected("/login"));
        assert!(!guard.is_protected("/administrator"));
        assert!(!guard.is_protected("/api/auth/login"));
    }

    #[test]
    fn test_login_redirect_is_temporary() {
        let response = guard().login_redirect().into_response();

        assert_eq!(response.status(), axum::http::StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()["location"], "/login");
    }
}
