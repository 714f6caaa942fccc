// SPDX-License-Identifier: MIT

//! Registration and session lifecycle routes.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{User, UserProfile};
use crate::routes::validate_payload;
use crate::services::tokens::hash_password;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub organization: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: UserProfile,
}

/// Register a new account. Non-admin accounts start unapproved and
/// cannot log in until an administrator approves them.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    validate_payload(&payload)?;

    if state.db.find_user_by_phone(&payload.phone).await?.is_some() {
        return Err(AppError::Conflict(
            "Phone number is already registered".to_string(),
        ));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name,
        phone: payload.phone,
        organization: payload.organization,
        password_hash: hash_password(&payload.password)?,
        is_admin: payload.is_admin,
        // Admin accounts are approved at creation
        is_approved: payload.is_admin,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user.id, "Account registered");

    Ok(Json(RegisterResponse {
        success: true,
        message: "Registration complete".to_string(),
        user: user.profile(),
    }))
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Log in with phone and password.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    // Reject malformed input before any store access
    validate_payload(&payload)?;

    let (pair, user) = state.tokens.login(&payload.phone, &payload.password).await?;

    tracing::info!(user_id = %user.id, "Login succeeded");

    Ok(Json(SessionResponse {
        success: true,
        message: "Login succeeded".to_string(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: Some(user.profile()),
    }))
}

#[derive(Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Rotate a refresh token for a new session pair. The old token is
/// invalidated whether or not the caller keeps it.
async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<SessionResponse>> {
    validate_payload(&payload)?;

    let (pair, user) = state.tokens.rotate_refresh(&payload.refresh_token).await?;

    Ok(Json(SessionResponse {
        success: true,
        message: "Session renewed".to_string(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: Some(user.profile()),
    }))
}

#[derive(Deserialize, Validate)]
pub struct LogoutRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// Revoke a refresh token. Succeeds even when the token was already
/// gone, so logout is idempotent from the client's perspective.
async fn logout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>> {
    validate_payload(&payload)?;

    state.tokens.revoke(&payload.refresh_token).await?;

    Ok(Json(LogoutResponse {
        success: true,
        message: "Logged out".to_string(),
    }))
}
