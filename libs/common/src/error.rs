//! Custom error types for the common library
//!
//! This module defines the storage error type shared by every service
//! that talks to PostgreSQL.

use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(#[from] MigrateError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A stored row could not be mapped back into a domain value
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl DatabaseError {
    /// Returns true when the underlying query failed on a unique constraint
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Query(SqlxError::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_query_errors_are_not_unique_violations() {
        let err = DatabaseError::Configuration("bad url".to_string());
        assert!(!err.is_unique_violation());

        let err = DatabaseError::Query(SqlxError::RowNotFound);
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_error_messages() {
        let err = DatabaseError::CorruptRow("role".to_string());
        assert_eq!(err.to_string(), "Corrupt row: role");
    }
}
