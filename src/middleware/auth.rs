// src/middleware/auth.rs

use axum::{
    extract::{ConnectInfo, FromRequestParts, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    services::fingerprint::{client_ip, DeviceMetadata},
};

/// The authorized principal, as established by `auth_guard`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// The raw bearer token of the current request (logout needs it).
#[derive(Debug, Clone)]
pub struct AuthToken(pub String);

/// Guard for protected routes.
///
/// A request is authorized only when BOTH hold: the bearer token verifies
/// cryptographically, and an active session exists for (token, fingerprint
/// of this request). A valid token replayed from another device fails the
/// second check with `SessionRejected`.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)?
        .to_string();

    // Fails with InvalidToken or TokenExpired before any DB work
    let claims = app_state.auth_service.decode(&token)?;

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let ip = client_ip(request.headers(), peer);
    let meta = DeviceMetadata::from_headers(request.headers(), ip);

    let session = app_state
        .session_service
        .validate_session(&token, &meta)
        .await?
        .ok_or(AppError::SessionRejected)?;

    // Recency signal for cap eviction
    app_state.session_service.touch(&session).await?;

    request.extensions_mut().insert(AuthenticatedUser {
        id: claims.sub,
        email: claims.email,
        name: claims.name,
    });
    request.extensions_mut().insert(AuthToken(token));

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthToken>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
