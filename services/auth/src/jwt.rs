//! JWT service for session token generation and validation
//!
//! Session tokens are HS256-signed JWTs. They are handed to the browser both
//! as the `token` cookie and in the JSON body of login/registration
//! responses, and checked here for signature and expiry.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::models::{Role, User};

const MIN_SECRET_LEN: usize = 32;
/// Longest accepted token lifetime: one year
const MAX_TOKEN_EXPIRY: u64 = 365 * 24 * 60 * 60;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
    /// Token lifetime in seconds (default: 7 days)
    pub token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Signing secret, at least 32 bytes
    /// - `JWT_EXPIRY`: Token lifetime in seconds (default: 604800, at most one year)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let token_expiry = std::env::var("JWT_EXPIRY")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604800);

        if token_expiry == 0 || token_expiry > MAX_TOKEN_EXPIRY {
            anyhow::bail!(
                "JWT_EXPIRY must be between 1 and {} seconds",
                MAX_TOKEN_EXPIRY
            );
        }

        Ok(JwtConfig {
            secret,
            token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User email at issue time
    pub email: String,
    /// User role at issue time
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        if config.secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT secret must be at least {} bytes", MIN_SECRET_LEN);
        }
        if config.token_expiry == 0 || config.token_expiry > MAX_TOKEN_EXPIRY {
            anyhow::bail!(
                "JWT token lifetime must be between 1 and {} seconds",
                MAX_TOKEN_EXPIRY
            );
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Generate a session token for a user
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now
                .checked_add(self.config.token_expiry)
                .ok_or_else(|| anyhow::anyhow!("Token expiry overflows"))?,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Get the token lifetime in seconds
    pub fn token_expiry(&self) -> u64 {
        self.config.token_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serial_test::serial;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "0123456789abcdef0123456789abcdef".to_string(),
            token_expiry: 3600,
        })
        .unwrap()
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "A".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Moderator,
            totp_secret: None,
            totp_enabled: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_and_validate() {
        let service = service();
        let user = user();

        let token = service.generate_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::Moderator);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let service = service();
        let token = service.generate_token(&user()).unwrap();

        let other = JwtService::new(JwtConfig {
            secret: "fedcba9876543210fedcba9876543210".to_string(),
            token_expiry: 3600,
        })
        .unwrap();

        assert!(other.validate_token(&token).is_err());
        assert!(service.validate_token("not.a.token").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = service();
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            role: Role::User,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &service.encoding_key).unwrap();

        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn test_short_secret_is_refused() {
        let result = JwtService::new(JwtConfig {
            secret: "short".to_string(),
            token_expiry: 60,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_lifetime_is_refused() {
        for token_expiry in [0, MAX_TOKEN_EXPIRY + 1, u64::MAX] {
            let result = JwtService::new(JwtConfig {
                secret: "0123456789abcdef0123456789abcdef".to_string(),
                token_expiry,
            });
            assert!(result.is_err(), "lifetime {} accepted", token_expiry);
        }
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env() {
        unsafe {
            std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
            std::env::remove_var("JWT_EXPIRY");
        }

        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.token_expiry, 604800);

        unsafe {
            std::env::set_var("JWT_EXPIRY", u64::MAX.to_string());
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::set_var("JWT_EXPIRY", "3600");
        }
        assert_eq!(JwtConfig::from_env().unwrap().token_expiry, 3600);

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_EXPIRY");
        }
        assert!(JwtConfig::from_env().is_err());
    }
}
