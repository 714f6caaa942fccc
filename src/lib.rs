// SPDX-License-Identifier: MIT

//! Slope-Registry: geospatial backend for steep-slope hazard sites.
//!
//! This crate provides the backend API for tracking hazard sites, their
//! inspection histories, risk data, user accounts with role-based
//! approval, and threaded comments with image attachments.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{ImageBackupService, ObjectStorage, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub storage: ObjectStorage,
    pub tokens: TokenService,
    pub backups: ImageBackupService,
}
