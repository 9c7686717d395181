//! Service settings loaded from `AUTH_*` environment variables

use anyhow::{Context, Result};
use common::redirect::RedirectTrackerConfig;
use config::{Config, Environment};
use serde::Deserialize;
use std::time::Duration;

/// Where user accounts are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Authentication service settings
///
/// # Environment Variables
/// - `AUTH_BIND_ADDRESS` (default: `0.0.0.0:3000`)
/// - `AUTH_STORAGE`: `postgres` or `memory` (default: `postgres`)
/// - `AUTH_PROTECTED_PREFIXES`: comma separated (default: `/admin,/profile,/dashboard`)
/// - `AUTH_LOGIN_PATH` (default: `/login`)
/// - `AUTH_TOTP_ISSUER` (default: `Gatekeeper`)
/// - `AUTH_TOTP_SKEW`: tolerated time steps (default: 1)
/// - `AUTH_MAX_REDIRECTS` (default: 5)
/// - `AUTH_REDIRECT_WINDOW_MS` (default: 3000)
/// - `AUTH_SECURE_COOKIES` (default: false)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub bind_address: String,
    pub storage: StorageBackend,
    pub protected_prefixes: String,
    pub login_path: String,
    pub totp_issuer: String,
    pub totp_skew: u8,
    pub max_redirects: usize,
    pub redirect_window_ms: u64,
    pub secure_cookies: bool,
}

impl AuthConfig {
    /// Load settings from the environment on top of the defaults
    pub fn load() -> Result<Self> {
        Self::from_source(Environment::with_prefix("AUTH").try_parsing(true))
    }

    fn from_source(source: Environment) -> Result<Self> {
        let config: AuthConfig = Config::builder()
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("storage", "postgres")?
            .set_default("protected_prefixes", "/admin,/profile,/dashboard")?
            .set_default("login_path", "/login")?
            .set_default("totp_issuer", "Gatekeeper")?
            .set_default("totp_skew", 1)?
            .set_default("max_redirects", 5)?
            .set_default("redirect_window_ms", 3000)?
            .set_default("secure_cookies", false)?
            .add_source(source)
            .build()
            .context("Failed to read AUTH_* settings")?
            .try_deserialize()
            .context("Invalid AUTH_* settings")?;

        if !config.login_path.starts_with('/') {
            anyhow::bail!("AUTH_LOGIN_PATH must start with '/'");
        }
        if config.max_redirects == 0 {
            anyhow::bail!("AUTH_MAX_REDIRECTS must be at least 1");
        }

        Ok(config)
    }

    /// The configured protected path prefixes
    pub fn prefixes(&self) -> Vec<String> {
        self.protected_prefixes
            .split(',')
            .map(|p| p.trim().trim_end_matches('/'))
            .filter(|p| p.starts_with('/') && p.len() > 1)
            .map(str::to_string)
            .collect()
    }

    /// Redirect tracker settings
    pub fn redirect_tracker(&self) -> RedirectTrackerConfig {
        RedirectTrackerConfig {
            max_redirects: self.max_redirects,
            window: Duration::from_millis(self.redirect_window_ms),
        }
    }
}
