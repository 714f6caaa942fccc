// SPDX-License-Identifier: MIT

//! Slope record routes (authenticated).
//!
//! Coordinate derivation runs as an explicit step in the create/update
//! handlers before persistence. The image endpoint is split into an
//! upload-acceptance step (multipart -> object-store URLs) and a pure
//! domain-update step, composed sequentially.

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::slope::{
    CollapseRisk, CoordinateGroup, Inspection, MaintenanceProject, SlopeLocation, SlopeManagement,
};
use crate::models::{DmsComponent, ImageRef, ImageSlot, Slope, SlopeImageSet};
use crate::routes::validate_payload;
use crate::services::storage::slope_object_key;
use crate::AppState;

/// Upload size cap, matching the object-store policy.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/slopes", get(search_slopes))
        .route("/api/slopes", post(create_slope))
        .route("/api/slopes/near", get(slopes_near))
        .route("/api/slopes/{history_number}", get(get_slope))
        .route("/api/slopes/{management_no}/record", put(update_slope))
        .route("/api/slopes/{management_no}/record", delete(delete_slope))
        .route("/api/slopes/{history_number}/images", put(update_images))
}

// ─── Lookup & Search ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct SlopeResponse {
    pub success: bool,
    pub data: Slope,
}

/// Get a slope by its inspection-history number.
async fn get_slope(
    State(state): State<Arc<AppState>>,
    Path(history_number): Path<String>,
) -> Result<Json<SlopeResponse>> {
    let slope = state
        .db
        .get_slope_by_history_number(&history_number)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No slope with history number {}",
                history_number
            ))
        })?;

    Ok(Json(SlopeResponse {
        success: true,
        data: slope,
    }))
}

#[derive(Deserialize)]
struct SearchQuery {
    province: Option<String>,
    city: Option<String>,
    /// Name prefix filter
    name: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    50
}

const MAX_LIMIT: u32 = 200;

#[derive(Serialize)]
pub struct SlopeListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Slope>,
}

/// Search slopes by region equality and name prefix.
async fn search_slopes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SlopeListResponse>> {
    let limit = query.limit.min(MAX_LIMIT);
    let slopes = state
        .db
        .search_slopes(
            query.province.as_deref(),
            query.city.as_deref(),
            query.name.as_deref(),
            limit,
        )
        .await?;

    Ok(Json(SlopeListResponse {
        success: true,
        count: slopes.len(),
        data: slopes,
    }))
}

#[derive(Deserialize)]
struct NearQuery {
    longitude: f64,
    latitude: f64,
    /// Search radius in meters
    #[serde(default = "default_radius")]
    radius: f64,
}

fn default_radius() -> f64 {
    1000.0
}

/// Find slopes whose start point lies within the radius.
async fn slopes_near(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearQuery>,
) -> Result<Json<SlopeListResponse>> {
    if !(-180.0..=180.0).contains(&query.longitude) || !(-90.0..=90.0).contains(&query.latitude) {
        return Err(AppError::validation("Coordinates out of range"));
    }

    let slopes = state
        .db
        .find_slopes_near(query.longitude, query.latitude, query.radius)
        .await?;

    Ok(Json(SlopeListResponse {
        success: true,
        count: slopes.len(),
        data: slopes,
    }))
}

// ─── Create & Update ─────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateSlopeRequest {
    #[validate(length(min = 1))]
    pub management_no: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub history_number: String,
    #[validate(length(min = 1))]
    pub province: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub district: String,
    pub address: Option<String>,
    pub road_address: Option<String>,
    #[serde(default)]
    pub start_latitude: DmsComponent,
    #[serde(default)]
    pub start_longitude: DmsComponent,
    #[serde(default)]
    pub end_latitude: DmsComponent,
    #[serde(default)]
    pub end_longitude: DmsComponent,
    #[serde(default)]
    pub management: SlopeManagement,
    #[serde(default)]
    pub inspections: Vec<Inspection>,
    #[serde(default)]
    pub collapse_risk: CollapseRisk,
    #[serde(default)]
    pub maintenance_project: MaintenanceProject,
}

/// Create a slope. The decimal pairs are derived here, before the
/// record is first persisted.
async fn create_slope(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSlopeRequest>,
) -> Result<Json<SlopeResponse>> {
    validate_payload(&payload)?;

    if state.db.get_slope(&payload.management_no).await?.is_some() {
        return Err(AppError::Conflict(
            "Management number is already registered".to_string(),
        ));
    }

    let mut slope = Slope {
        management_no: payload.management_no,
        name: payload.name,
        history_number: payload.history_number,
        location: SlopeLocation {
            province: payload.province,
            city: payload.city,
            district: payload.district,
            address: payload.address,
            road_address: payload.road_address,
            start: CoordinateGroup {
                point: None,
                latitude: payload.start_latitude,
                longitude: payload.start_longitude,
            },
            end: CoordinateGroup {
                point: None,
                latitude: payload.end_latitude,
                longitude: payload.end_longitude,
            },
        },
        management: payload.management,
        inspections: payload.inspections,
        collapse_risk: payload.collapse_risk,
        maintenance_project: payload.maintenance_project,
        images: SlopeImageSet::default(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    // New record: the DMS inputs are by definition fresh
    slope.derive_coordinates(true);
    state.db.upsert_slope(&slope).await?;

    tracing::info!(management_no = %slope.management_no, "Slope created");

    Ok(Json(SlopeResponse {
        success: true,
        data: slope,
    }))
}

/// One optional group per allowed field set. Supplying `coordinates`
/// counts as a DMS edit and triggers re-derivation.
#[derive(Deserialize, Validate)]
pub struct UpdateSlopeRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub road_address: Option<String>,
    pub coordinates: Option<CoordinateUpdate>,
    pub management: Option<SlopeManagement>,
    pub inspections: Option<Vec<Inspection>>,
    pub collapse_risk: Option<CollapseRisk>,
    pub maintenance_project: Option<MaintenanceProject>,
}

#[derive(Deserialize)]
pub struct CoordinateUpdate {
    #[serde(default)]
    pub start_latitude: DmsComponent,
    #[serde(default)]
    pub start_longitude: DmsComponent,
    #[serde(default)]
    pub end_latitude: DmsComponent,
    #[serde(default)]
    pub end_longitude: DmsComponent,
}

/// Update a slope record.
async fn update_slope(
    State(state): State<Arc<AppState>>,
    Path(management_no): Path<String>,
    Json(payload): Json<UpdateSlopeRequest>,
) -> Result<Json<SlopeResponse>> {
    validate_payload(&payload)?;

    let mut slope = state
        .db
        .get_slope(&management_no)
        .await?
        .ok_or_else(|| AppError::NotFound("Slope not found".to_string()))?;

    if let Some(name) = payload.name {
        slope.name = name;
    }
    if payload.address.is_some() {
        slope.location.address = payload.address;
    }
    if payload.road_address.is_some() {
        slope.location.road_address = payload.road_address;
    }
    if let Some(management) = payload.management {
        slope.management = management;
    }
    if let Some(inspections) = payload.inspections {
        slope.inspections = inspections;
    }
    if let Some(collapse_risk) = payload.collapse_risk {
        slope.collapse_risk = collapse_risk;
    }
    if let Some(maintenance_project) = payload.maintenance_project {
        slope.maintenance_project = maintenance_project;
    }

    let dms_changed = if let Some(coords) = payload.coordinates {
        slope.location.start.latitude = coords.start_latitude;
        slope.location.start.longitude = coords.start_longitude;
        slope.location.end.latitude = coords.end_latitude;
        slope.location.end.longitude = coords.end_longitude;
        true
    } else {
        false
    };

    // Derive-then-construct: recompute pairs only per the combined rule
    slope.derive_coordinates(dms_changed);
    state.db.upsert_slope(&slope).await?;

    Ok(Json(SlopeResponse {
        success: true,
        data: slope,
    }))
}

#[derive(Serialize)]
pub struct DeleteSlopeResponse {
    pub success: bool,
    pub message: String,
}

/// Delete a slope record.
async fn delete_slope(
    State(state): State<Arc<AppState>>,
    Path(management_no): Path<String>,
) -> Result<Json<DeleteSlopeResponse>> {
    if state.db.get_slope(&management_no).await?.is_none() {
        return Err(AppError::NotFound("Slope not found".to_string()));
    }

    state.db.delete_slope(&management_no).await?;

    Ok(Json(DeleteSlopeResponse {
        success: true,
        message: "Slope deleted".to_string(),
    }))
}

// ─── Image Update ────────────────────────────────────────────────

/// Uploads accepted from the multipart body, ready for the domain step.
struct AcceptedUploads {
    images: Vec<(ImageSlot, ImageRef)>,
    deletes: Vec<ImageSlot>,
}

/// Step (a): drain the multipart body. Image parts are named after
/// their slot and streamed to the object store; `delete` parts name
/// slots to clear. Produces URLs only, no domain mutation.
async fn accept_uploads(
    state: &AppState,
    history_number: &str,
    multipart: &mut Multipart,
) -> Result<AcceptedUploads> {
    let mut accepted = AcceptedUploads {
        images: Vec::new(),
        deletes: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        if field_name == "delete" {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::validation(format!("Malformed delete field: {}", e)))?;
            let slot = ImageSlot::parse(&value)
                .ok_or_else(|| AppError::validation(format!("Invalid delete slot: {}", value)))?;
            accepted.deletes.push(slot);
            continue;
        }

        let slot = ImageSlot::parse(&field_name)
            .ok_or_else(|| AppError::validation(format!("Invalid image slot: {}", field_name)))?;

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

        let key = slope_object_key(history_number, slot.as_str(), &extension);
        let url = state.storage.put(&key, bytes.to_vec(), &content_type).await?;

        accepted.images.push((
            slot,
            ImageRef {
                url,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        ));
    }

    Ok(accepted)
}

#[derive(Serialize)]
pub struct ImageUpdateSummary {
    pub updated: usize,
    pub deleted: usize,
}

#[derive(Serialize)]
pub struct ImageUpdateResponse {
    pub success: bool,
    pub history_number: String,
    pub summary: ImageUpdateSummary,
    pub images: SlopeImageSet,
    pub total_images: usize,
}

/// Replace, add and delete slope images in one request.
///
/// Step (b) applies the accepted uploads to the record; stale object
/// deletes and shadow writes are best-effort and never block the
/// primary save.
async fn update_images(
    State(state): State<Arc<AppState>>,
    Path(history_number): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ImageUpdateResponse>> {
    let mut slope = state
        .db
        .get_slope_by_history_number(&history_number)
        .await?
        .ok_or_else(|| AppError::NotFound("Slope not found".to_string()))?;

    let accepted = accept_uploads(&state, &history_number, &mut multipart).await?;

    let mut deleted = 0usize;
    for slot in &accepted.deletes {
        if let Some(existing) = slope.images.get(*slot) {
            if let Err(e) = state.storage.delete(&existing.url).await {
                tracing::warn!(slot = %slot, error = %e, "Stale image object delete failed");
            }
            slope.images.set(*slot, None);
            deleted += 1;
            state
                .backups
                .record_slope_delete(&history_number, *slot)
                .await;
        }
    }

    let mut updated = 0usize;
    for (slot, image) in &accepted.images {
        // Replacing a live image: drop the old object, best-effort
        if let Some(existing) = slope.images.get(*slot) {
            if let Err(e) = state.storage.delete(&existing.url).await {
                tracing::warn!(slot = %slot, error = %e, "Stale image object delete failed");
            }
        }
        slope.images.set(*slot, Some(image.clone()));
        updated += 1;
        state
            .backups
            .record_slope_upsert(&history_number, *slot, image.clone())
            .await;
    }

    // The primary write is authoritative and proceeds regardless of the
    // backup subsystem's health.
    state.db.upsert_slope(&slope).await?;

    let total_images = slope.images.count();
    Ok(Json(ImageUpdateResponse {
        success: true,
        history_number,
        summary: ImageUpdateSummary { updated, deleted },
        images: slope.images,
        total_images,
    }))
}
