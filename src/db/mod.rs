// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const REFRESH_TOKENS: &str = "refresh_tokens";
    pub const SLOPES: &str = "slopes";
    pub const COMMENTS: &str = "comments";
    /// Shadow copies of slope image slots (keyed by history number)
    pub const SLOPE_IMAGE_BACKUPS: &str = "slope_image_backups";
    /// Shadow copies of comment image lists (keyed by history number + comment id)
    pub const COMMENT_IMAGE_BACKUPS: &str = "comment_image_backups";
}
