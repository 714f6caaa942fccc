// SPDX-License-Identifier: MIT

//! JWT authentication middleware.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from an access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub phone: String,
    pub name: String,
    pub is_admin: bool,
}

impl AuthUser {
    /// Self-or-admin check used by the user routes.
    pub fn can_act_on(&self, user_id: &str) -> bool {
        self.is_admin || self.user_id == user_id
    }
}

/// Middleware that requires a valid access token.
///
/// Stateless fast path: signature and expiry only, no store lookup.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    let claims = state
        .tokens
        .verify_access(token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let auth_user = AuthUser {
        user_id: claims.sub,
        phone: claims.phone,
        name: claims.name,
        is_admin: claims.admin,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
