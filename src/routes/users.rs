// SPDX-License-Identifier: MIT

//! User administration routes (authenticated).

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::routes::validate_payload;
use crate::services::tokens::{hash_password, verify_password};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/{user_id}", get(get_user))
        .route("/api/users/{user_id}", put(update_user))
        .route("/api/users/{user_id}", delete(delete_user))
        .route("/api/users/{user_id}/approve", post(approve_user))
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub data: Vec<UserProfile>,
}

/// List every account (admin only). Credential hashes never leave the
/// store layer.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserListResponse>> {
    if !auth.is_admin {
        return Err(AppError::Forbidden);
    }

    let users = state.db.list_users().await?;
    Ok(Json(UserListResponse {
        success: true,
        data: users.iter().map(|u| u.profile()).collect(),
    }))
}

#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub data: UserProfile,
}

/// Get one account (self or admin).
async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>> {
    if !auth.can_act_on(&user_id) {
        return Err(AppError::Forbidden);
    }

    let user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse {
        success: true,
        data: user.profile(),
    }))
}

/// Explicit update command: one optional group per allowed field.
/// A password change must prove knowledge of the current password.
#[derive(Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub phone: Option<String>,
    #[validate(length(min = 1))]
    pub organization: Option<String>,
    #[validate(length(min = 1))]
    pub password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Serialize)]
pub struct UpdateUserResponse {
    pub success: bool,
    pub message: String,
    pub data: UserProfile,
}

/// Update account fields (self or admin).
async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UpdateUserResponse>> {
    validate_payload(&payload)?;

    if !auth.can_act_on(&user_id) {
        return Err(AppError::Forbidden);
    }

    let mut user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(new_password) = &payload.password {
        let current = payload.current_password.as_deref().ok_or_else(|| {
            AppError::validation_fields(
                "Current password is required to change the password",
                vec!["current_password".to_string()],
            )
        })?;
        if !verify_password(current, &user.password_hash) {
            return Err(AppError::Auth("Current password does not match".to_string()));
        }
        user.password_hash = hash_password(new_password)?;
    }

    if let Some(phone) = &payload.phone {
        // Another account may already own the new phone number
        if let Some(existing) = state.db.find_user_by_phone(phone).await? {
            if existing.id != user.id {
                return Err(AppError::Conflict(
                    "Phone number is already registered".to_string(),
                ));
            }
        }
        user.phone = phone.clone();
    }
    if let Some(name) = payload.name {
        user.name = name;
    }
    if let Some(organization) = payload.organization {
        user.organization = organization;
    }

    state.db.upsert_user(&user).await?;

    Ok(Json(UpdateUserResponse {
        success: true,
        message: "Account updated".to_string(),
        data: user.profile(),
    }))
}

#[derive(Serialize)]
pub struct DeleteUserResponse {
    pub success: bool,
    pub message: String,
}

/// Delete an account (self or admin). Outstanding refresh records go
/// with it so deleted accounts cannot renew a session.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<DeleteUserResponse>> {
    if !auth.can_act_on(&user_id) {
        return Err(AppError::Forbidden);
    }

    if state.db.get_user(&user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let removed = state.db.delete_refresh_tokens_for_user(&user_id).await?;
    state.db.delete_user(&user_id).await?;

    tracing::info!(user_id = %user_id, revoked_sessions = removed, "Account deleted");

    Ok(Json(DeleteUserResponse {
        success: true,
        message: "Account deleted".to_string(),
    }))
}

/// Approve a pending account (admin only).
async fn approve_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>> {
    if !auth.is_admin {
        return Err(AppError::Forbidden);
    }

    let mut user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    user.is_approved = true;
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user_id, approved_by = %auth.user_id, "Account approved");

    Ok(Json(UserResponse {
        success: true,
        data: user.profile(),
    }))
}
