// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod backup;
pub mod storage;
pub mod tokens;

pub use backup::{ImageBackupService, RestoreReport};
pub use storage::ObjectStorage;
pub use tokens::{AccessClaims, SessionPair, TokenService};
