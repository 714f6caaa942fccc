// SPDX-License-Identifier: MIT

//! Slope-Registry API Server
//!
//! Tracks steep-slope hazard sites, inspection histories and their
//! image evidence, with role-gated user accounts and comments.

use slope_registry::{
    config::Config,
    db::FirestoreDb,
    services::{ImageBackupService, ObjectStorage, TokenService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Slope-Registry API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize object storage
    let storage = ObjectStorage::new(&config.storage_bucket);
    tracing::info!(bucket = %config.storage_bucket, "Object storage initialized");

    // Initialize the token service and backup reconciler
    let tokens = TokenService::new(db.clone(), &config);
    let backups = ImageBackupService::new(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        storage,
        tokens,
        backups,
    });

    // Build router
    let app = slope_registry::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("slope_registry=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
