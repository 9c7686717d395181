//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    AppState,
    accounts::{self, Registration},
    error::AuthError,
    jwt::Claims,
    middleware,
    models::UserView,
    pages, session,
    validation::require_fields,
};

/// Request for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub totp_code: Option<String>,
}

/// Request carrying a one-time code
#[derive(Debug, Deserialize)]
pub struct TotpCodeRequest {
    pub code: Option<String>,
}

/// Response for a started session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub user: UserView,
}

/// Response for the current user
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserView,
    pub two_factor_enabled: bool,
}

/// Response for 2FA setup
#[derive(Debug, Serialize)]
pub struct TotpSetupResponse {
    pub success: bool,
    pub secret: String,
    pub otpauth_url: String,
    pub qr_code: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/2fa/setup", post(totp_setup))
        .route("/api/auth/2fa/enable", post(totp_enable))
        .route("/api/auth/2fa/disable", post(totp_disable))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_session));

    let page_routes = Router::new()
        .route("/login", get(pages::login))
        .route("/logout", get(pages::logout))
        .route("/dashboard", get(pages::dashboard))
        .route("/profile", get(pages::profile))
        .route("/admin", get(pages::admin));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .merge(session_routes)
        .merge(page_routes)
        .layer(from_fn_with_state(state.clone(), middleware::route_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AuthError::Validation(vec![rejection.body_text()]))
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let payload = json_body(payload)?;
    let [name, email, password] = require_fields([
        ("name", payload.name),
        ("email", payload.email),
        ("password", payload.password),
    ])?;

    info!("Registration attempt for: {}", email);

    let user = accounts::register(
        state.users.as_ref(),
        Registration {
            name,
            email,
            password,
        },
    )
    .await?;

    let token = state.jwt_service.generate_token(&user)?;
    let jar = session::start_session(jar, &state.cookies, token.clone());

    Ok((
        StatusCode::CREATED,
        jar,
        Json(SessionResponse {
            success: true,
            token,
            user: user.view(),
        }),
    ))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let payload = json_body(payload)?;
    let [email, password] =
        require_fields([("email", payload.email), ("password", payload.password)])?;

    info!("Login attempt for: {}", email);

    let user = accounts::login(
        state.users.as_ref(),
        &state.totp_service,
        &email,
        &password,
        payload.totp_code.as_deref(),
    )
    .await?;

    let token = state.jwt_service.generate_token(&user)?;
    let jar = session::start_session(jar, &state.cookies, token.clone());

    Ok((
        StatusCode::OK,
        jar,
        Json(SessionResponse {
            success: true,
            token,
            user: user.view(),
        }),
    ))
}

/// Logout endpoint
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    info!("Logout request");

    (
        session::end_session(jar),
        Json(serde_json::json!({
            "success": true,
            "redirect": pages::LOGGED_OUT_PATH,
        })),
    )
}

/// Current user endpoint
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AuthError> {
    let user = accounts::session_user(state.users.as_ref(), claims.sub).await?;

    Ok(Json(MeResponse {
        success: true,
        two_factor_enabled: user.totp_enabled,
        user: user.view(),
    }))
}

/// Start 2FA enrollment
pub async fn totp_setup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AuthError> {
    let enrollment =
        accounts::begin_totp_setup(state.users.as_ref(), &state.totp_service, claims.sub).await?;

    Ok(Json(TotpSetupResponse {
        success: true,
        secret: enrollment.secret.secret,
        otpauth_url: enrollment.secret.otpauth_url,
        qr_code: enrollment.qr_code,
    }))
}

/// Confirm 2FA enrollment with a first code
pub async fn totp_enable(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<TotpCodeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let [code] = require_fields([("code", json_body(payload)?.code)])?;

    accounts::enable_totp(state.users.as_ref(), &state.totp_service, claims.sub, &code).await?;

    Ok(Json(serde_json::json!({ "success": true, "two_factor_enabled": true })))
}

/// Turn 2FA off
pub async fn totp_disable(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<TotpCodeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let [code] = require_fields([("code", json_body(payload)?.code)])?;

    accounts::disable_totp(state.users.as_ref(), &state.totp_service, claims.sub, &code).await?;

    Ok(Json(serde_json::json!({ "success": true, "two_factor_enabled": false })))
}
