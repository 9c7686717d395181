//! Authentication service
//!
//! Account registration and login, optional TOTP two-factor auth, cookie
//! sessions, a presence-only route guard for protected pages, and
//! redirect-loop breaking for clients holding a stale session cookie.

pub mod accounts;
pub mod config;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod pages;
pub mod password;
pub mod redirect_guard;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod totp;
pub mod validation;

use std::sync::Arc;

use crate::{
    config::AuthConfig,
    jwt::JwtService,
    middleware::RouteGuard,
    redirect_guard::RedirectLoopGuard,
    repositories::UserStore,
    session::CookieSettings,
    totp::TotpService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub jwt_service: JwtService,
    pub totp_service: TotpService,
    pub cookies: CookieSettings,
    pub route_guard: Arc<RouteGuard>,
    pub redirects: RedirectLoopGuard,
}

impl AppState {
    /// Wire the service components together from settings
    pub fn new(users: Arc<dyn UserStore>, jwt_service: JwtService, config: &AuthConfig) -> Self {
        let cookies = CookieSettings {
            max_age_secs: jwt_service.token_expiry(),
            secure: config.secure_cookies,
        };

        Self {
            users,
            totp_service: TotpService::new(config.totp_issuer.clone(), config.totp_skew),
            cookies,
            route_guard: Arc::new(RouteGuard::new(
                config.prefixes(),
                config.login_path.clone(),
            )),
            redirects: RedirectLoopGuard::new(config.redirect_tracker()),
            jwt_service,
        }
    }
}
