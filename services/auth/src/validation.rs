//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::error::AuthError;

/// Validate display name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().chars().count() > 50 {
        return Err("Name cannot be more than 50 characters".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email.trim()) {
        return Err("Please provide a valid email".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters".to_string());
    }

    Ok(())
}

/// Take the value of every required field, or report all that are missing.
///
/// A field counts as missing when it is absent or only whitespace.
pub fn require_fields<const N: usize>(
    fields: [(&str, Option<String>); N],
) -> Result<[String; N], AuthError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if !missing.is_empty() {
        return Err(AuthError::MissingFields(join_names(&missing)));
    }

    Ok(fields.map(|(_, value)| value.unwrap_or_default()))
}

/// Run every registration rule and collect the failures
pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), AuthError> {
    let errors: Vec<String> = [
        validate_name(name),
        validate_email(email),
        validate_password(password),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(errors))
    }
}

fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
