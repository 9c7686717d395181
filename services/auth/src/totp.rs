//! TOTP secrets, verification and QR codes for two-factor authentication

use anyhow::{Result, anyhow};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const STEP_SECONDS: u64 = 30;

/// A freshly generated secret ready for enrollment
#[derive(Debug, Clone, Serialize)]
pub struct TotpSecret {
    /// Base32 encoded shared secret
    pub secret: String,
    /// `otpauth://` URI for authenticator apps
    pub otpauth_url: String,
}

/// TOTP service
#[derive(Debug, Clone)]
pub struct TotpService {
    issuer: String,
    skew: u8,
}

impl TotpService {
    /// Create a TOTP service.
    ///
    /// `skew` is the number of 30 second steps tolerated either side of now.
    pub fn new(issuer: impl Into<String>, skew: u8) -> Self {
        Self {
            issuer: issuer.into(),
            skew,
        }
    }

    /// Generate a new secret and its provisioning URI for `email`
    pub fn generate_secret(&self, email: &str) -> Result<TotpSecret> {
        let secret_bytes = Secret::generate_secret()
            .to_bytes()
            .map_err(|e| anyhow!("Secret gen error: {e}"))?;

        let totp = TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            self.skew,
            STEP_SECONDS,
            secret_bytes,
            Some(self.issuer.clone()),
            email.to_string(),
        )
        .map_err(|e| anyhow!("TOTP init error: {e}"))?;

        Ok(TotpSecret {
            secret: totp.get_secret_base32(),
            otpauth_url: totp.get_url(),
        })
    }

    /// Check a submitted code against a base32 secret.
    ///
    /// Whitespace inside the code is ignored. Malformed codes or secrets
    /// never verify.
    pub fn verify_token(&self, token: &str, secret: &str) -> bool {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(now) => self.verify_token_at(token, secret, now.as_secs()),
            Err(e) => {
                tracing::error!("System clock before Unix epoch: {}", e);
                false
            }
        }
    }

    /// Check a submitted code as of `unix_time` seconds
    pub fn verify_token_at(&self, token: &str, secret: &str, unix_time: u64) -> bool {
        let code: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        if code.len() != DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }

        match self.totp_for(secret) {
            Ok(totp) => totp.check(&code, unix_time),
            Err(e) => {
                tracing::warn!("Rejecting TOTP check against unusable secret: {}", e);
                false
            }
        }
    }

    /// Render an `otpauth://` URI as a PNG data URI
    pub fn generate_qr_code(&self, otpauth_url: &str) -> Result<String> {
        let totp = TOTP::from_url(otpauth_url).map_err(|e| anyhow!("Invalid otpauth URL: {e}"))?;
        let qr = totp
            .get_qr_base64()
            .map_err(|e| anyhow!("QR gen error: {e}"))?;

        Ok(format!("data:image/png;base64,{qr}"))
    }

    fn totp_for(&self, secret: &str) -> Result<TOTP> {
        let secret_bytes = Secret::Encoded(secret.trim().to_uppercase())
            .to_bytes()
            .map_err(|e| anyhow!("Secret decode error: {e:?}"))?;

        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            self.skew,
            STEP_SECONDS,
            secret_bytes,
            Some(self.issuer.clone()),
            "user".to_string(), // label doesn't matter for check
        )
        .map_err(|e| anyhow!("TOTP init error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TotpService {
        TotpService::new("Gatekeeper", 1)
    }

    fn current_code(service: &TotpService, secret: &str) -> String {
        service.totp_for(secret).unwrap().generate_current().unwrap()
    }

    #[test]
    fn test_generate_secret() {
        let generated = service().generate_secret("a@x.com").unwrap();

        assert!(!generated.secret.is_empty());
        assert!(generated.otpauth_url.starts_with("otpauth://totp/"));
        assert!(generated.otpauth_url.contains("issuer=Gatekeeper"));
        assert!(generated.otpauth_url.contains(&generated.secret));
    }

    #[test]
    fn test_verify_current_code() {
        let service = service();
        let generated = service.generate_secret("a@x.com").unwrap();
        let code = current_code(&service, &generated.secret);

        assert!(service.verify_token(&code, &generated.secret));
    }

    #[test]
    fn test_verify_strips_whitespace() {
        let service = service();
        let generated = service.generate_secret("a@x.com").unwrap();
        let code = current_code(&service, &generated.secret);
        let spaced = format!(" {} {} ", &code[..3], &code[3..]);

        assert!(service.verify_token(&spaced, &generated.secret));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let service = service();
        let generated = service.generate_secret("a@x.com").unwrap();

        assert!(!service.verify_token("", &generated.secret));
        assert!(!service.verify_token("12345", &generated.secret));
        assert!(!service.verify_token("abcdef", &generated.secret));
        assert!(!service.verify_token("123456", "not base32 !!"));
    }

    /// Base32 of the ASCII secret `12345678901234567890` from RFC 6238
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
    const OTHER_SECRET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

    #[test]
    fn test_verify_known_codes_at_fixed_time() {
        let service = service();

        // RFC 6238 SHA1 vectors, truncated to six digits
        assert!(service.verify_token_at("287082", RFC_SECRET, 59));
        assert!(service.verify_token_at("081804", RFC_SECRET, 1111111109));
        assert!(service.verify_token_at("005924", RFC_SECRET, 1234567890));

        // A valid code from far outside the skew window
        assert!(!service.verify_token_at("081804", RFC_SECRET, 59));
    }

    #[test]
    fn test_code_for_other_secret_fails() {
        let service = service();
        let other = service.totp_for(OTHER_SECRET).unwrap();

        let accepted: Vec<String> = [29, 59, 89].iter().map(|t| other.generate(*t)).collect();
        assert!(!accepted.contains(&"287082".to_string()));

        assert!(!service.verify_token_at("287082", OTHER_SECRET, 59));
    }

    #[test]
    fn test_generate_qr_code() {
        let service = service();
        let generated = service.generate_secret("a@x.com").unwrap();
        let qr = service.generate_qr_code(&generated.otpauth_url).unwrap();

        assert!(qr.starts_with("data:image/png;base64,"));
        assert!(service.generate_qr_code("https://example.com").is_err());
    }
}
