//! Error taxonomy for the authentication service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by the authentication API
#[derive(Debug, Error)]
pub enum AuthError {
    /// One or more required fields were absent or blank
    #[error("Please provide {0}")]
    MissingFields(String),

    /// Input failed schema validation
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    /// A unique field already exists
    #[error("User already exists with this {field}")]
    Conflict { field: &'static str },

    /// Unknown account or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account has 2FA enabled and no code was supplied
    #[error("Two-factor authentication code required")]
    TotpRequired,

    /// The supplied one-time code did not verify
    #[error("Invalid two-factor authentication code")]
    InvalidTotp,

    /// 2FA enable/disable requested without a stored secret
    #[error("Two-factor authentication is not set up")]
    TotpNotConfigured,

    /// 2FA setup requested while already enabled
    #[error("Two-factor authentication is already enabled")]
    TotpAlreadyEnabled,

    /// Missing, malformed or expired session token
    #[error("Not authorized to access this route")]
    Unauthorized,

    /// Storage failure
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Any other unexpected failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// JSON error envelope
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl AuthError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingFields(_)
            | AuthError::Validation(_)
            | AuthError::TotpNotConfigured => StatusCode::BAD_REQUEST,
            AuthError::Conflict { .. } | AuthError::TotpAlreadyEnabled => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::TotpRequired
            | AuthError::InvalidTotp
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingFields(_) => "MISSING_FIELDS",
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::Conflict { .. } => "DUPLICATE_KEY",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::TotpRequired => "TOTP_REQUIRED",
            AuthError::InvalidTotp => "INVALID_TOTP",
            AuthError::TotpNotConfigured => "TOTP_NOT_CONFIGURED",
            AuthError::TotpAlreadyEnabled => "TOTP_ALREADY_ENABLED",
            AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::Database(_) | AuthError::Internal(_) => "SERVER_ERROR",
        }
    }

    fn body(&self) -> ErrorBody {
        let error = match self {
            AuthError::Database(_) | AuthError::Internal(_) => "Server error".to_string(),
            other => other.to_string(),
        };
        let field = match self {
            AuthError::Conflict { field } => Some(*field),
            _ => None,
        };

        ErrorBody {
            success: false,
            error,
            code: Some(self.code()),
            field,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Internal error: {:?}", self);
        } else {
            warn!("Request rejected ({}): {}", self.code(), self);
        }

        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_names_field() {
        let err = AuthError::Conflict { field: "email" };
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["field"], "email");
        assert_eq!(body["code"], "DUPLICATE_KEY");
    }

    #[test]
    fn test_validation_messages_are_joined() {
        let err = AuthError::Validation(vec![
            "Please provide a valid email".to_string(),
            "Password must be at least 6 characters".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Please provide a valid email, Password must be at least 6 characters"
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = AuthError::Internal(anyhow::anyhow!("connection refused at 10.0.0.3"));
        let body = serde_json::to_value(err.body()).unwrap();

        assert_eq!(body["error"], "Server error");
        assert!(body.get("field").is_none());
    }
}
