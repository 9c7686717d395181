//! Server-rendered pages: login, logout and the protected area

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    AppState, accounts,
    models::{Role, User},
    session,
};

/// Where a client lands after logging out
pub const LOGGED_OUT_PATH: &str = "/login?logged_out=true";

const DASHBOARD_PATH: &str = "/dashboard";

/// Client-side cleanup run on the login page after logout.
///
/// Clears any copy of the session the browser kept outside the HttpOnly
/// cookie, then drops `logged_out` from the address bar.
const SESSION_CLEANUP_SCRIPT: &str = r#"<script>
  document.cookie = "token=; Max-Age=0; path=/";
  window.localStorage.removeItem("auth_token");
  window.localStorage.removeItem("user_data");
  setTimeout(function () {
    var url = new URL(window.location.href);
    url.searchParams.delete("logged_out");
    window.history.replaceState({}, document.title, url.pathname + url.search);
  }, 1500);
</script>"#;

/// Query parameters understood by the login page
#[derive(Debug, Default, Deserialize)]
pub struct LoginPageQuery {
    pub logged_out: Option<String>,
    pub bypass: Option<String>,
}

/// Login page
///
/// Clients that still hold a session cookie are forwarded to the dashboard.
/// When that forwarding keeps coming back here, the cookie is dropped and
/// the form is shown with a bypass marker.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginPageQuery>,
    jar: CookieJar,
) -> Response {
    if query.logged_out.as_deref() == Some("true") {
        info!("Rendering login page after logout");
        return (
            session::end_session(jar),
            Html(login_page(Some("You have been logged out."), true)),
        )
            .into_response();
    }

    if query.bypass.is_some() {
        debug!("Login page requested with bypass marker");
        return Html(login_page(None, false)).into_response();
    }

    let Some(token) = session::session_token(&jar) else {
        return Html(login_page(None, false)).into_response();
    };

    if state.redirects.track(&token, DASHBOARD_PATH).await {
        state.redirects.reset(&token).await;
        let target = format!("/login?bypass={}", state.redirects.bypass_marker());
        warn!("Breaking redirect loop, clearing session cookie");
        return (session::end_session(jar), Redirect::to(&target)).into_response();
    }

    Redirect::to(DASHBOARD_PATH).into_response()
}

/// Logout page: drop the cookie and show the logged-out login page
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    info!("Logout via page");
    (session::end_session(jar), Redirect::to(LOGGED_OUT_PATH))
}

/// Dashboard page
pub async fn dashboard(State(state): State<AppState>, jar: CookieJar) -> Response {
    match page_user(&state, &jar).await {
        Some(user) => Html(layout(
            "Dashboard",
            &format!("<p>Welcome back, {}.</p>", escape_html(&user.name)),
        ))
        .into_response(),
        None => state.route_guard.login_redirect().into_response(),
    }
}

/// Profile page
pub async fn profile(State(state): State<AppState>, jar: CookieJar) -> Response {
    match page_user(&state, &jar).await {
        Some(user) => Html(layout(
            "Profile",
            &format!(
                "<dl><dt>Name</dt><dd>{}</dd><dt>Email</dt><dd>{}</dd>\
                 <dt>Role</dt><dd>{}</dd><dt>Two-factor</dt><dd>{}</dd></dl>",
                escape_html(&user.name),
                escape_html(&user.email),
                user.role,
                if user.totp_enabled { "on" } else { "off" },
            ),
        ))
        .into_response(),
        None => state.route_guard.login_redirect().into_response(),
    }
}

/// Admin page, restricted to the `admin` role
pub async fn admin(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(user) = page_user(&state, &jar).await else {
        return state.route_guard.login_redirect().into_response();
    };

    if user.role != Role::Admin {
        warn!("User {} with role {} denied admin page", user.id, user.role);
        return (
            StatusCode::FORBIDDEN,
            Html(layout("Forbidden", "<p>Administrator access required.</p>")),
        )
            .into_response();
    }

    Html(layout(
        "Admin",
        &format!("<p>Signed in as {}.</p>", escape_html(&user.email)),
    ))
    .into_response()
}

/// The account behind the request's session cookie.
///
/// A valid session ends any redirect chain the client was in.
async fn page_user(state: &AppState, jar: &CookieJar) -> Option<User> {
    let token = session::session_token(jar)?;

    let claims = match state.jwt_service.validate_token(&token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Invalid session cookie on page request: {}", e);
            return None;
        }
    };

    let user = accounts::session_user(state.users.as_ref(), claims.sub)
        .await
        .ok()?;

    state.redirects.reset(&token).await;
    Some(user)
}

fn login_page(notice: Option<&str>, cleanup: bool) -> String {
    let mut body = String::new();

    if let Some(notice) = notice {
        body.push_str(&format!("<p class=\"notice\">{}</p>", escape_html(notice)));
    }

    body.push_str(
        r#"<form id="login-form">
  <label>Email <input type="email" name="email" required></label>
  <label>Password <input type="password" name="password" required></label>
  <label>Authentication code <input type="text" name="totp_code" inputmode="numeric" autocomplete="one-time-code"></label>
  <button type="submit">Log in</button>
</form>
<script>
  document.getElementById("login-form").addEventListener("submit", async function (event) {
    event.preventDefault();
    var form = new FormData(event.target);
    var payload = {
      email: form.get("email"),
      password: form.get("password"),
      totp_code: form.get("totp_code") || null
    };
    var response = await fetch("/api/auth/login", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify(payload)
    });
    if (response.ok) {
      window.location.href = "/dashboard";
    }
  });
</script>"#,
    );

    if cleanup {
        body.push_str(SESSION_CLEANUP_SCRIPT);
    }

    layout("Log in", &body)
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\">\
         <title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
        body = body,
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_login_page_cleanup_only_after_logout() {
        let page = login_page(Some("You have been logged out."), true);
        assert!(page.contains("localStorage.removeItem(\"auth_token\")"));
        assert!(page.contains("localStorage.removeItem(\"user_data\")"));
        assert!(page.contains("1500"));

        assert!(!login_page(None, false).contains("auth_token"));
    }
}
