// SPDX-License-Identifier: MIT

//! User account and refresh-token records.

use serde::{Deserialize, Serialize};

/// User account stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document id (UUID v4)
    pub id: String,
    /// Display name
    pub name: String,
    /// Phone number (unique login identity)
    pub phone: String,
    /// Organization the user belongs to
    pub organization: String,
    /// Argon2id hash in PHC string format
    pub password_hash: String,
    /// Administrator flag
    pub is_admin: bool,
    /// Accounts require admin approval before login. Admin accounts are
    /// approved at creation.
    pub is_approved: bool,
    /// When the account was registered (RFC 3339)
    pub created_at: String,
}

impl User {
    /// Public view without the credential hash.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            organization: self.organization.clone(),
            is_admin: self.is_admin,
            is_approved: self.is_approved,
            created_at: self.created_at.clone(),
        }
    }
}

/// User fields safe to return to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub organization: String,
    pub is_admin: bool,
    pub is_approved: bool,
    pub created_at: String,
}

/// Persisted refresh-token record.
///
/// The token string itself is the document id, so lookup and revocation
/// are single-document operations. One valid record per user under
/// normal operation; concurrent logins can transiently leave two
/// (delete-then-insert is not transactional).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: String,
    /// Expiry (RFC 3339); checked on every rotation
    pub expires_at: String,
    pub created_at: String,
}

impl RefreshTokenRecord {
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        chrono::DateTime::parse_from_rfc3339(&self.expires_at)
            .map(|exp| exp.with_timezone(&chrono::Utc) < now)
            .unwrap_or(true)
    }
}
