// SPDX-License-Identifier: MIT

//! Comment routes (authenticated).
//!
//! Comments hang off an inspection history. Their image lists are
//! mirrored into the comment backup store fire-and-continue, like the
//! slope image slots.

use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Comment;
use crate::routes::validate_payload;
use crate::services::storage::comment_object_key;
use crate::AppState;

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/histories/{history_number}/comments",
            get(list_comments),
        )
        .route(
            "/api/histories/{history_number}/comments",
            post(create_comment),
        )
        .route("/api/comments/{comment_id}", put(update_comment))
        .route("/api/comments/{comment_id}", delete(delete_comment))
}

#[derive(Serialize)]
pub struct CommentListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Comment>,
}

/// List comments for an inspection history, newest first.
async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(history_number): Path<String>,
) -> Result<Json<CommentListResponse>> {
    let comments = state.db.get_comments_for_history(&history_number).await?;

    Ok(Json(CommentListResponse {
        success: true,
        count: comments.len(),
        data: comments,
    }))
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub data: Comment,
}

/// Create a comment. Multipart body: a `content` text part plus any
/// number of `images` file parts uploaded to the object store first.
async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(history_number): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<CommentResponse>> {
    if state
        .db
        .get_slope_by_history_number(&history_number)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!(
            "No slope with history number {}",
            history_number
        )));
    }

    let mut content = String::new();
    let mut image_urls = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "content" => {
                content = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Malformed content field: {}", e)))?;
            }
            "images" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !content_type.starts_with("image/") {
                    return Err(AppError::validation("Only image uploads are allowed"));
                }
                let extension = field
                    .file_name()
                    .and_then(|name| name.rsplit('.').next())
                    .unwrap_or("jpg")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Upload read failed: {}", e)))?;
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(AppError::validation("Image exceeds the 10 MiB limit"));
                }

                let key = comment_object_key(&history_number, &extension);
                let url = state.storage.put(&key, bytes.to_vec(), &content_type).await?;
                image_urls.push(url);
            }
            other => {
                return Err(AppError::validation(format!(
                    "Unexpected multipart field: {}",
                    other
                )));
            }
        }
    }

    if content.is_empty() {
        return Err(AppError::validation_fields(
            "Comment content is required",
            vec!["content".to_string()],
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        history_number: history_number.clone(),
        user_id: auth.user_id,
        content,
        image_urls,
        created_at: now.clone(),
        updated_at: now,
    };
    state.db.upsert_comment(&comment).await?;

    if !comment.image_urls.is_empty() {
        state
            .backups
            .record_comment_images(&history_number, &comment.id, &comment.image_urls)
            .await;
    }

    Ok(Json(CommentResponse {
        success: true,
        data: comment,
    }))
}

#[derive(Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1))]
    pub content: Option<String>,
    /// Full replacement image list; URLs not in it are deleted from the
    /// object store best-effort.
    pub image_urls: Option<Vec<String>>,
}

/// Update a comment (author or admin).
async fn update_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<String>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>> {
    validate_payload(&payload)?;

    let mut comment = state
        .db
        .get_comment(&comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if !auth.can_act_on(&comment.user_id) {
        return Err(AppError::Forbidden);
    }

    if let Some(content) = payload.content {
        comment.content = content;
    }

    let images_changed = if let Some(new_urls) = payload.image_urls {
        for old_url in &comment.image_urls {
            if !new_urls.contains(old_url) {
                if let Err(e) = state.storage.delete(old_url).await {
                    tracing::warn!(url = %old_url, error = %e, "Stale image object delete failed");
                }
            }
        }
        comment.image_urls = new_urls;
        true
    } else {
        false
    };

    comment.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.upsert_comment(&comment).await?;

    if images_changed {
        // List-based owner: the whole tracked list is replaced
        state
            .backups
            .record_comment_images(&comment.history_number, &comment.id, &comment.image_urls)
            .await;
    }

    Ok(Json(CommentResponse {
        success: true,
        data: comment,
    }))
}

#[derive(Serialize)]
pub struct DeleteCommentResponse {
    pub success: bool,
    pub message: String,
}

/// Delete a comment and its images (author or admin).
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<Json<DeleteCommentResponse>> {
    let comment = state
        .db
        .get_comment(&comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if !auth.can_act_on(&comment.user_id) {
        return Err(AppError::Forbidden);
    }

    for url in &comment.image_urls {
        if let Err(e) = state.storage.delete(url).await {
            tracing::warn!(url = %url, error = %e, "Image object delete failed");
        }
    }

    state.db.delete_comment(&comment_id).await?;
    state
        .backups
        .remove_comment_backup(&comment.history_number, &comment.id)
        .await;

    Ok(Json(DeleteCommentResponse {
        success: true,
        message: "Comment deleted".to_string(),
    }))
}
