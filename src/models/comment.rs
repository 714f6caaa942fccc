// SPDX-License-Identifier: MIT

//! Threaded comments on slope inspection histories.

use serde::{Deserialize, Serialize};

/// A comment attached to an inspection history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Document id (UUID v4)
    pub id: String,
    /// Owner key (inspection-history number)
    pub history_number: String,
    /// Author's user id
    pub user_id: String,
    pub content: String,
    /// Object-store URLs, in display order
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}
