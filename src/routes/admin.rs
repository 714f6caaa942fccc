// SPDX-License-Identifier: MIT

//! Administrative maintenance routes.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Slope;
use crate::services::RestoreReport;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/restore-images", post(restore_images))
        .route("/api/admin/slopes", get(list_all_slopes))
        .route("/api/admin/slopes/data-quality", get(slope_data_quality))
}

#[derive(Serialize)]
pub struct RestoreResponse {
    pub success: bool,
    pub report: RestoreReport,
}

/// Run a full image reconciliation pass (admin only).
///
/// Runs synchronously within the request; per-owner failures land in
/// the report instead of aborting the pass.
async fn restore_images(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<RestoreResponse>> {
    if !auth.is_admin {
        return Err(AppError::Forbidden);
    }

    tracing::info!(admin = %auth.user_id, "Image restore pass requested");

    let report = state.backups.restore_all().await?;

    Ok(Json(RestoreResponse {
        success: true,
        report,
    }))
}

#[derive(Serialize)]
pub struct AdminSlopeListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Slope>,
}

/// Unfiltered slope listing (admin only).
async fn list_all_slopes(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AdminSlopeListResponse>> {
    if !auth.is_admin {
        return Err(AppError::Forbidden);
    }

    let slopes = state.db.list_slopes().await?;

    Ok(Json(AdminSlopeListResponse {
        success: true,
        count: slopes.len(),
        data: slopes,
    }))
}

#[derive(Debug, Serialize)]
pub struct DataQualityIssue {
    pub management_no: String,
    pub missing_fields: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct DataQualityReport {
    pub scanned: usize,
    /// Records with empty required fields (legacy bulk imports)
    pub incomplete: Vec<DataQualityIssue>,
    /// History numbers shared by more than one record. Management
    /// numbers are the document id and cannot collide; history numbers
    /// can, and a collision corrupts backup and comment ownership.
    pub duplicate_history_numbers: Vec<String>,
}

/// Pure scan over a slope listing, separated out so the audit rules are
/// testable without a store.
fn audit_slopes(slopes: &[Slope]) -> DataQualityReport {
    let mut incomplete = Vec::new();
    let mut history_counts: HashMap<&str, usize> = HashMap::new();

    for slope in slopes {
        let missing = slope.missing_required_fields();
        if !missing.is_empty() {
            incomplete.push(DataQualityIssue {
                management_no: slope.management_no.clone(),
                missing_fields: missing,
            });
        }
        if !slope.history_number.trim().is_empty() {
            *history_counts.entry(slope.history_number.as_str()).or_insert(0) += 1;
        }
    }

    let mut duplicate_history_numbers: Vec<String> = history_counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(history, _)| history.to_string())
        .collect();
    duplicate_history_numbers.sort();

    DataQualityReport {
        scanned: slopes.len(),
        incomplete,
        duplicate_history_numbers,
    }
}

#[derive(Serialize)]
pub struct DataQualityResponse {
    pub success: bool,
    pub report: DataQualityReport,
}

/// Data-quality audit over the whole slope collection (admin only).
async fn slope_data_quality(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DataQualityResponse>> {
    if !auth.is_admin {
        return Err(AppError::Forbidden);
    }

    let slopes = state.db.list_slopes().await?;
    let report = audit_slopes(&slopes);

    tracing::info!(
        scanned = report.scanned,
        incomplete = report.incomplete.len(),
        duplicate_histories = report.duplicate_history_numbers.len(),
        "Slope data-quality audit complete"
    );

    Ok(Json(DataQualityResponse {
        success: true,
        report,
    }))
}
