// SPDX-License-Identifier: MIT

//! Session token issuance, verification and rotation.
//!
//! Access tokens are short-lived and stateless: verification is a
//! signature/expiry check and never touches the store. Refresh tokens
//! are long-lived and stateful: a record per token lives in the
//! `refresh_tokens` collection and every rotation deletes the old
//! record before persisting the new one, so a rotated-out token replays
//! as not-found.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{RefreshTokenRecord, User};

/// Access tokens live 15 minutes.
pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;
/// Refresh tokens live 7 days.
pub const REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user document id)
    pub sub: String,
    pub phone: String,
    pub name: String,
    pub admin: bool,
    pub iat: usize,
    pub exp: usize,
}

/// Claims carried by a refresh token. The authoritative state is the
/// store record; the signature only proves we minted the string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// Access + refresh token issued together at login or rotation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues, verifies and rotates session credentials.
#[derive(Clone)]
pub struct TokenService {
    db: FirestoreDb,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
}

impl TokenService {
    pub fn new(db: FirestoreDb, config: &Config) -> Self {
        Self {
            db,
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
        }
    }

    /// An empty secret fails the specific operation; tokens are never
    /// signed with a default key.
    fn require_secret(secret: &[u8], name: &str) -> Result<(), AppError> {
        if secret.is_empty() {
            return Err(AppError::Configuration(format!(
                "{} signing secret is not configured",
                name
            )));
        }
        Ok(())
    }

    fn unix_now() -> Result<usize, AppError> {
        Ok(SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs() as usize)
    }

    /// Authenticate by phone and password and issue a session.
    ///
    /// The approval gate runs strictly before the password comparison:
    /// an unapproved account gets the pending-approval response whether
    /// or not the supplied password is correct.
    pub async fn login(&self, phone: &str, password: &str) -> Result<(SessionPair, User), AppError> {
        let user = self
            .db
            .find_user_by_phone(phone)
            .await?
            .ok_or_else(|| AppError::Auth("Invalid phone number or password".to_string()))?;

        if !user.is_approved {
            return Err(AppError::PendingApproval);
        }

        if !verify_password(password, &user.password_hash) {
            return Err(AppError::Auth("Invalid phone number or password".to_string()));
        }

        let pair = self.issue_session(&user).await?;
        Ok((pair, user))
    }

    /// Issue a fresh session pair for a user and persist the refresh
    /// record, deleting any prior record(s) for that user first.
    pub async fn issue_session(&self, user: &User) -> Result<SessionPair, AppError> {
        Self::require_secret(&self.access_secret, "access-token")?;
        Self::require_secret(&self.refresh_secret, "refresh-token")?;

        let now = Self::unix_now()?;

        let access_claims = AccessClaims {
            sub: user.id.clone(),
            phone: user.phone.clone(),
            name: user.name.clone(),
            admin: user.is_admin,
            iat: now,
            exp: now + ACCESS_TOKEN_TTL_SECS as usize,
        };
        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &access_claims,
            &EncodingKey::from_secret(&self.access_secret),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Access token encoding failed: {}", e)))?;

        let refresh_claims = RefreshClaims {
            sub: user.id.clone(),
            iat: now,
            exp: now + REFRESH_TOKEN_TTL_SECS as usize,
        };
        let refresh_token = encode(
            &Header::new(Algorithm::HS256),
            &refresh_claims,
            &EncodingKey::from_secret(&self.refresh_secret),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Refresh token encoding failed: {}", e)))?;

        // Delete-then-insert, not transactional: two concurrent logins
        // can transiently leave two valid records.
        let removed = self.db.delete_refresh_tokens_for_user(&user.id).await?;
        if removed > 0 {
            tracing::debug!(user_id = %user.id, removed, "Replaced prior refresh records");
        }

        let expires_at = chrono::Utc::now()
            + chrono::Duration::seconds(REFRESH_TOKEN_TTL_SECS as i64);
        let record = RefreshTokenRecord {
            token: refresh_token.clone(),
            user_id: user.id.clone(),
            expires_at: expires_at.to_rfc3339(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.db.upsert_refresh_token(&record).await?;

        Ok(SessionPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token. Stateless fast path: signature and
    /// expiry only, fails closed on any error.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AppError> {
        Self::require_secret(&self.access_secret, "access-token")?;

        let key = DecodingKey::from_secret(&self.access_secret);
        let validation = Validation::new(Algorithm::HS256);

        decode::<AccessClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Auth("Invalid or expired access token".to_string()))
    }

    /// Rotate a refresh token: verify the store record, the signature,
    /// and the owning account, then replace the record with a new pair.
    ///
    /// Check order is observable and fixed: store lookup, record
    /// expiry (expired records are deleted before rejecting, so replay
    /// returns not-found), signature, account state.
    pub async fn rotate_refresh(&self, token: &str) -> Result<(SessionPair, User), AppError> {
        Self::require_secret(&self.refresh_secret, "refresh-token")?;

        let record = self
            .db
            .get_refresh_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Refresh token not found".to_string()))?;

        if record.is_expired(chrono::Utc::now()) {
            self.db.delete_refresh_token(token).await?;
            return Err(AppError::Auth("Refresh token has expired".to_string()));
        }

        let key = DecodingKey::from_secret(&self.refresh_secret);
        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<RefreshClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Auth("Invalid refresh token".to_string()))?;

        if claims.sub != record.user_id {
            return Err(AppError::Auth("Invalid refresh token".to_string()));
        }

        let user = self
            .db
            .get_user(&record.user_id)
            .await?
            .ok_or_else(|| AppError::Auth("Account no longer exists".to_string()))?;
        if !user.is_approved {
            return Err(AppError::PendingApproval);
        }

        // Rotation-on-use: the old record goes away before the new pair
        // is issued, so replaying the old token fails with not-found.
        self.db.delete_refresh_token(token).await?;

        let pair = self.issue_session(&user).await?;
        Ok((pair, user))
    }

    /// Revoke a refresh token (logout). Deleting an absent record is
    /// still success.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.db.delete_refresh_token(token).await?;
        Ok(())
    }
}

/// Hash a password with Argon2id (PHC string format).
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}
