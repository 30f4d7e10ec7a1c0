// src/handlers/auth.rs

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::{AuthToken, AuthenticatedUser},
    models::auth::{
        AuthResponse, CurrentUserResponse, ForgotPasswordPayload, LoginPayload,
        ResetForgotPasswordPayload, ResetPasswordPayload, SignupPayload,
    },
    services::fingerprint::{client_ip, DeviceMetadata},
};

fn device_meta(headers: &HeaderMap, addr: SocketAddr) -> DeviceMetadata {
    DeviceMetadata::from_headers(headers, client_ip(headers, Some(addr)))
}

// POST /api/auth/signup
pub async fn signup(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<SignupPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let meta = device_meta(&headers, addr);
    let (user, token) = app_state
        .auth_service
        .signup(&payload.name, &payload.email, &payload.password, &meta)
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

// POST /api/auth/login
pub async fn login(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let meta = device_meta(&headers, addr);
    let (user, token) = app_state
        .auth_service
        .login(&payload.email, &payload.password, &meta)
        .await?;

    Ok(Json(AuthResponse { user, token }))
}

// POST /api/auth/logout (protected)
pub async fn logout(
    State(app_state): State<AppState>,
    AuthToken(token): AuthToken,
) -> Result<impl IntoResponse, AppError> {
    app_state.auth_service.logout(&token).await?;
    Ok(Json(json!({ "message": "Logged out successfully." })))
}

// GET /api/auth/user (protected)
pub async fn get_current_user(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CurrentUserResponse>, AppError> {
    let (user, total_customers) = app_state.auth_service.current_user(user.id).await?;
    Ok(Json(CurrentUserResponse {
        user,
        total_customers,
    }))
}

// POST /api/auth/forgot-password
pub async fn forgot_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state.auth_service.forgot_password(&payload.email).await?;

    // Same answer whether or not the account exists
    Ok(Json(json!({
        "message": "If the e-mail exists, a reset code has been sent."
    })))
}

// POST /api/auth/reset-forgot-password
pub async fn reset_forgot_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetForgotPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state
        .auth_service
        .reset_forgot_password(&payload.email, &payload.reset_code, &payload.new_password)
        .await?;

    Ok(Json(json!({ "message": "Password reset successfully." })))
}

// POST /api/auth/reset-password
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state
        .auth_service
        .reset_password(&payload.email, &payload.password, &payload.new_password)
        .await?;

    Ok(Json(json!({ "message": "Password reset successfully." })))
}
