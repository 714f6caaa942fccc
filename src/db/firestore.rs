// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts, approval state)
//! - Refresh tokens (stateful session records)
//! - Slopes (hazard sites with embedded images)
//! - Comments (per inspection history)
//! - Image backups (shadow records for the reconciler)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    Comment, CommentImageBackup, RefreshTokenRecord, Slope, SlopeImageBackup, User,
};
use futures_util::{stream, StreamExt};
use geo::{Distance, Haversine, Point};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore has no native geospatial queries; near-queries fetch up to
/// this many candidates and filter by distance in-process.
const NEAR_QUERY_CANDIDATES: u32 = 1000;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by phone number (the login identity).
    pub async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, AppError> {
        let phone = phone.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("phone").eq(phone.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// List all users (admin view).
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user account.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Refresh Token Operations ────────────────────────────────

    /// Look up a refresh-token record by token string (the document id).
    pub async fn get_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REFRESH_TOKENS)
            .obj()
            .one(token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Persist a refresh-token record.
    pub async fn upsert_refresh_token(
        &self,
        record: &RefreshTokenRecord,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REFRESH_TOKENS)
            .document_id(&record.token)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a refresh-token record. Succeeds even if absent.
    pub async fn delete_refresh_token(&self, token: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::REFRESH_TOKENS)
            .document_id(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete every refresh-token record owned by a user.
    ///
    /// Used on login and rotation so that at most one record stays valid
    /// per user. Not transactional with the following insert; see the
    /// documented concurrent-login race.
    pub async fn delete_refresh_tokens_for_user(&self, user_id: &str) -> Result<usize, AppError> {
        let user_id_owned = user_id.to_string();
        let records: Vec<RefreshTokenRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REFRESH_TOKENS)
            .filter(move |q| q.field("user_id").eq(user_id_owned.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = records.len();
        stream::iter(records)
            .map(|record| async move { self.delete_refresh_token(&record.token).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(count)
    }

    // ─── Slope Operations ────────────────────────────────────────

    /// Get a slope by management number (the document id).
    pub async fn get_slope(&self, management_no: &str) -> Result<Option<Slope>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SLOPES)
            .obj()
            .one(management_no)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a slope by its inspection-history number (the owner key for
    /// images and comments).
    pub async fn get_slope_by_history_number(
        &self,
        history_number: &str,
    ) -> Result<Option<Slope>, AppError> {
        let history = history_number.to_string();
        let slopes: Vec<Slope> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SLOPES)
            .filter(move |q| q.field("history_number").eq(history.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(slopes.into_iter().next())
    }

    /// Create or update a slope.
    pub async fn upsert_slope(&self, slope: &Slope) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SLOPES)
            .document_id(&slope.management_no)
            .object(slope)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a slope.
    pub async fn delete_slope(&self, management_no: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SLOPES)
            .document_id(management_no)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List every slope, newest first (admin views and audits).
    pub async fn list_slopes(&self) -> Result<Vec<Slope>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SLOPES)
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search slopes by administrative region and name prefix.
    ///
    /// Prefix matching uses the standard Firestore range trick on the
    /// name field; region filters are equality filters.
    pub async fn search_slopes(
        &self,
        province: Option<&str>,
        city: Option<&str>,
        name_prefix: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Slope>, AppError> {
        let province = province.map(str::to_string);
        let city = city.map(str::to_string);
        let name_prefix = name_prefix.map(str::to_string);

        self.get_client()?
            .fluent()
            .select()
            .from(collections::SLOPES)
            .filter(move |q| {
                let mut filters = Vec::new();
                if let Some(p) = &province {
                    filters.push(q.field("location.province").eq(p.clone()));
                }
                if let Some(c) = &city {
                    filters.push(q.field("location.city").eq(c.clone()));
                }
                if let Some(prefix) = &name_prefix {
                    let upper = format!("{}\u{f8ff}", prefix);
                    filters.push(q.field("name").greater_than_or_equal(prefix.clone()));
                    filters.push(q.field("name").less_than(upper));
                }
                q.for_all(filters)
            })
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find slopes whose derived start point lies within `radius_m`
    /// meters of the given position.
    ///
    /// Candidates are fetched with a bounded query and filtered by
    /// Haversine distance in-process.
    pub async fn find_slopes_near(
        &self,
        longitude: f64,
        latitude: f64,
        radius_m: f64,
    ) -> Result<Vec<Slope>, AppError> {
        let candidates: Vec<Slope> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SLOPES)
            .limit(NEAR_QUERY_CANDIDATES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let origin = Point::new(longitude, latitude);
        Ok(candidates
            .into_iter()
            .filter(|slope| {
                slope
                    .location
                    .start
                    .point
                    .as_ref()
                    .map(|p| {
                        let here = Point::new(p.longitude(), p.latitude());
                        Haversine.distance(origin, here) <= radius_m
                    })
                    .unwrap_or(false)
            })
            .collect())
    }

    // ─── Comment Operations ──────────────────────────────────────

    /// Get a comment by id.
    pub async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::COMMENTS)
            .obj()
            .one(comment_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List comments for an inspection history, newest first.
    pub async fn get_comments_for_history(
        &self,
        history_number: &str,
    ) -> Result<Vec<Comment>, AppError> {
        let history = history_number.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMMENTS)
            .filter(move |q| q.field("history_number").eq(history.clone()))
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a comment.
    pub async fn upsert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::COMMENTS)
            .document_id(&comment.id)
            .object(comment)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a comment.
    pub async fn delete_comment(&self, comment_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::COMMENTS)
            .document_id(comment_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Slope Image Backup Operations ───────────────────────────

    /// Get the slope image backup for a history number.
    pub async fn get_slope_backup(
        &self,
        history_number: &str,
    ) -> Result<Option<SlopeImageBackup>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SLOPE_IMAGE_BACKUPS)
            .obj()
            .one(history_number)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a slope image backup.
    pub async fn upsert_slope_backup(&self, backup: &SlopeImageBackup) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SLOPE_IMAGE_BACKUPS)
            .document_id(&backup.history_number)
            .object(backup)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List every slope image backup (reconciliation pass).
    pub async fn list_slope_backups(&self) -> Result<Vec<SlopeImageBackup>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SLOPE_IMAGE_BACKUPS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Comment Image Backup Operations ─────────────────────────

    /// Document id for a comment backup: owner key plus comment id.
    fn comment_backup_id(history_number: &str, comment_id: &str) -> String {
        format!("{}_{}", history_number, comment_id)
    }

    /// Get the image backup for one comment.
    pub async fn get_comment_backup(
        &self,
        history_number: &str,
        comment_id: &str,
    ) -> Result<Option<CommentImageBackup>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::COMMENT_IMAGE_BACKUPS)
            .obj()
            .one(Self::comment_backup_id(history_number, comment_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a comment image backup.
    pub async fn upsert_comment_backup(
        &self,
        backup: &CommentImageBackup,
    ) -> Result<(), AppError> {
        let doc_id = Self::comment_backup_id(&backup.history_number, &backup.comment_id);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::COMMENT_IMAGE_BACKUPS)
            .document_id(&doc_id)
            .object(backup)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete the image backup for one comment.
    pub async fn delete_comment_backup(
        &self,
        history_number: &str,
        comment_id: &str,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::COMMENT_IMAGE_BACKUPS)
            .document_id(Self::comment_backup_id(history_number, comment_id))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List every comment image backup (reconciliation pass).
    pub async fn list_comment_backups(&self) -> Result<Vec<CommentImageBackup>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMMENT_IMAGE_BACKUPS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
