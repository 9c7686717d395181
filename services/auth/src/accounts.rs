//! Account operations: registration, login and two-factor management

use tracing::info;
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{NewUser, User},
    password,
    repositories::{CreateOutcome, UserStore},
    totp::{TotpSecret, TotpService},
    validation,
};

/// Registration input with every required field present
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Secret material returned when 2FA setup starts
#[derive(Debug, Clone)]
pub struct TotpEnrollment {
    pub secret: TotpSecret,
    pub qr_code: String,
}

/// Create an account with the `user` role
pub async fn register(store: &dyn UserStore, registration: Registration) -> Result<User, AuthError> {
    validation::validate_registration(
        &registration.name,
        &registration.email,
        &registration.password,
    )?;

    if store.find_by_email(&registration.email).await?.is_some() {
        return Err(AuthError::Conflict { field: "email" });
    }

    let new_user = NewUser {
        name: registration.name,
        email: registration.email,
        password_hash: password::hash_password(&registration.password)?,
    };

    match store.create_or_conflict(&new_user).await? {
        CreateOutcome::Created(user) => {
            info!("User registered: {}", user.id);
            Ok(user)
        }
        CreateOutcome::Conflict { field } => Err(AuthError::Conflict { field }),
    }
}

/// Check credentials and, when enabled, the one-time code
pub async fn login(
    store: &dyn UserStore,
    totp: &TotpService,
    email: &str,
    password: &str,
    totp_code: Option<&str>,
) -> Result<User, AuthError> {
    let user = store
        .find_by_email(email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !password::verify_password(password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials);
    }

    if user.totp_enabled {
        let secret = user.totp_secret.as_deref().ok_or(AuthError::TotpNotConfigured)?;
        let code = totp_code
            .filter(|c| !c.trim().is_empty())
            .ok_or(AuthError::TotpRequired)?;

        if !totp.verify_token(code, secret) {
            return Err(AuthError::InvalidTotp);
        }
    }

    info!("User logged in: {}", user.id);
    Ok(user)
}

/// Fetch the account behind a session
pub async fn session_user(store: &dyn UserStore, user_id: Uuid) -> Result<User, AuthError> {
    store
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::Unauthorized)
}

/// Generate and store a pending TOTP secret
pub async fn begin_totp_setup(
    store: &dyn UserStore,
    totp: &TotpService,
    user_id: Uuid,
) -> Result<TotpEnrollment, AuthError> {
    let user = session_user(store, user_id).await?;
    if user.totp_enabled {
        return Err(AuthError::TotpAlreadyEnabled);
    }

    let secret = totp.generate_secret(&user.email)?;
    let qr_code = totp.generate_qr_code(&secret.otpauth_url)?;

    if !store.update_totp(user.id, Some(&secret.secret), false).await? {
        return Err(AuthError::Unauthorized);
    }

    info!("2FA setup started for user: {}", user.id);
    Ok(TotpEnrollment { secret, qr_code })
}

/// Turn on 2FA once the user proves possession of the pending secret
pub async fn enable_totp(
    store: &dyn UserStore,
    totp: &TotpService,
    user_id: Uuid,
    code: &str,
) -> Result<(), AuthError> {
    let user = session_user(store, user_id).await?;
    if user.totp_enabled {
        return Err(AuthError::TotpAlreadyEnabled);
    }
    let secret = user.totp_secret.as_deref().ok_or(AuthError::TotpNotConfigured)?;

    if !totp.verify_token(code, secret) {
        return Err(AuthError::InvalidTotp);
    }

    if !store.update_totp(user.id, Some(secret), true).await? {
        return Err(AuthError::Unauthorized);
    }

    info!("2FA enabled for user: {}", user.id);
    Ok(())
}

/// Turn off 2FA; requires a valid current code
pub async fn disable_totp(
    store: &dyn UserStore,
    totp: &TotpService,
    user_id: Uuid,
    code: &str,
) -> Result<(), AuthError> {
    let user = session_user(store, user_id).await?;
    let secret = match (user.totp_enabled, user.totp_secret.as_deref()) {
        (true, Some(secret)) => secret,
        _ => return Err(AuthError::TotpNotConfigured),
    };

    if !totp.verify_token(code, secret) {
        return Err(AuthError::InvalidTotp);
    }

    if !store.update_totp(user.id, None, false).await? {
        return Err(AuthError::Unauthorized);
    }

    info!("2FA disabled for user: {}", user.id);
    Ok(())
}
