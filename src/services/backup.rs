// SPDX-License-Identifier: MIT

//! Image backup recording and batch reconciliation.
//!
//! The shadow store mirrors every image reference embedded in slope and
//! comment records. Recording is fire-and-continue: the primary domain
//! write is authoritative and proceeds whether or not the shadow write
//! lands. `restore_all` walks the shadow store and repairs primary
//! records whose embedded references went missing.

use serde::Serialize;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{CommentImageBackup, ImageRef, ImageSlot, SlopeImageBackup, SlopeImageSet};

/// Aggregate result of one reconciliation pass.
#[derive(Debug, Default, Serialize)]
pub struct RestoreReport {
    /// Shadow records examined (slopes + comments)
    pub examined: usize,
    /// Primary records located by owner key
    pub found: usize,
    /// Primary records actually modified
    pub modified: usize,
    /// Individual image references copied back
    pub restored_images: usize,
    /// Owner keys with no matching primary record
    pub orphaned: Vec<String>,
    /// Per-owner failures (the batch never aborts on one owner)
    pub errors: Vec<String>,
}

/// Slots the shadow has that the primary is missing.
///
/// Pure decision, separated out so the restore rule is testable without
/// a store.
fn plan_slot_restores(primary: &SlopeImageSet, shadow: &SlopeImageSet) -> Vec<(ImageSlot, ImageRef)> {
    ImageSlot::ALL
        .iter()
        .filter_map(|slot| match (primary.get(*slot), shadow.get(*slot)) {
            (None, Some(image)) => Some((*slot, image.clone())),
            _ => None,
        })
        .collect()
}

/// Maintains shadow copies of image references and restores them.
#[derive(Clone)]
pub struct ImageBackupService {
    db: FirestoreDb,
}

impl ImageBackupService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    // ─── Recording (fire-and-continue) ───────────────────────────

    /// Mirror an image write into the slope's shadow record.
    ///
    /// Idempotent upsert; the shadow record is created lazily on the
    /// first image write. Failures are logged and swallowed.
    pub async fn record_slope_upsert(
        &self,
        history_number: &str,
        slot: ImageSlot,
        image: ImageRef,
    ) {
        if let Err(e) = self.slope_upsert_inner(history_number, slot, image).await {
            tracing::warn!(
                history_number,
                slot = %slot,
                error = %e,
                "Slope image backup write failed (primary write unaffected)"
            );
        }
    }

    async fn slope_upsert_inner(
        &self,
        history_number: &str,
        slot: ImageSlot,
        image: ImageRef,
    ) -> Result<(), AppError> {
        let mut backup = self
            .db
            .get_slope_backup(history_number)
            .await?
            .unwrap_or_else(|| SlopeImageBackup::new(history_number));

        backup.images.set(slot, Some(image));
        backup.last_backup_at = chrono::Utc::now().to_rfc3339();
        self.db.upsert_slope_backup(&backup).await
    }

    /// Clear one slot in the slope's shadow record. The record itself
    /// stays; only the slot is zeroed.
    pub async fn record_slope_delete(&self, history_number: &str, slot: ImageSlot) {
        if let Err(e) = self.slope_delete_inner(history_number, slot).await {
            tracing::warn!(
                history_number,
                slot = %slot,
                error = %e,
                "Slope image backup delete failed (primary write unaffected)"
            );
        }
    }

    async fn slope_delete_inner(
        &self,
        history_number: &str,
        slot: ImageSlot,
    ) -> Result<(), AppError> {
        let Some(mut backup) = self.db.get_slope_backup(history_number).await? else {
            return Ok(());
        };
        backup.images.set(slot, None);
        backup.last_backup_at = chrono::Utc::now().to_rfc3339();
        self.db.upsert_slope_backup(&backup).await
    }

    /// Mirror a comment's image list. List-based owner: the whole
    /// tracked list is replaced, which also covers deletions.
    pub async fn record_comment_images(
        &self,
        history_number: &str,
        comment_id: &str,
        image_urls: &[String],
    ) {
        let backup = CommentImageBackup {
            history_number: history_number.to_string(),
            comment_id: comment_id.to_string(),
            image_urls: image_urls.to_vec(),
            last_backup_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.db.upsert_comment_backup(&backup).await {
            tracing::warn!(
                history_number,
                comment_id,
                error = %e,
                "Comment image backup write failed (primary write unaffected)"
            );
        }
    }

    /// Drop the shadow record when its comment is deleted, so the
    /// reconciler does not report it as orphaned forever.
    pub async fn remove_comment_backup(&self, history_number: &str, comment_id: &str) {
        if let Err(e) = self
            .db
            .delete_comment_backup(history_number, comment_id)
            .await
        {
            tracing::warn!(
                history_number,
                comment_id,
                error = %e,
                "Comment image backup removal failed"
            );
        }
    }

    // ─── Reconciliation ──────────────────────────────────────────

    /// Walk every shadow record and copy references back into primary
    /// records whose corresponding slot or list is empty.
    ///
    /// A failure on one owner is collected into the report and the
    /// batch continues.
    pub async fn restore_all(&self) -> Result<RestoreReport, AppError> {
        let slope_backups = self.db.list_slope_backups().await?;
        let comment_backups = self.db.list_comment_backups().await?;
        Ok(self.reconcile(slope_backups, comment_backups).await)
    }

    /// Reconcile a given set of shadow records. Split from `restore_all`
    /// so the report arithmetic can be driven with a known input set.
    pub async fn reconcile(
        &self,
        slope_backups: Vec<SlopeImageBackup>,
        comment_backups: Vec<CommentImageBackup>,
    ) -> RestoreReport {
        let mut report = RestoreReport::default();

        for backup in slope_backups {
            report.examined += 1;
            let key = backup.history_number.clone();
            match self.restore_slope(&backup, &mut report).await {
                Ok(()) => {}
                Err(e) => report.errors.push(format!("slope {}: {}", key, e)),
            }
        }

        for backup in comment_backups {
            report.examined += 1;
            let key = format!("{}/{}", backup.history_number, backup.comment_id);
            match self.restore_comment(&backup, &mut report).await {
                Ok(()) => {}
                Err(e) => report.errors.push(format!("comment {}: {}", key, e)),
            }
        }

        tracing::info!(
            examined = report.examined,
            found = report.found,
            modified = report.modified,
            restored_images = report.restored_images,
            orphaned = report.orphaned.len(),
            errors = report.errors.len(),
            "Image restore pass complete"
        );

        report
    }

    async fn restore_slope(
        &self,
        backup: &SlopeImageBackup,
        report: &mut RestoreReport,
    ) -> Result<(), AppError> {
        let Some(mut slope) = self
            .db
            .get_slope_by_history_number(&backup.history_number)
            .await?
        else {
            report.orphaned.push(backup.history_number.clone());
            return Ok(());
        };
        report.found += 1;

        let restores = plan_slot_restores(&slope.images, &backup.images);
        if restores.is_empty() {
            return Ok(());
        }

        for (slot, image) in &restores {
            slope.images.set(*slot, Some(image.clone()));
        }
        // One persist per owner, however many slots came back
        self.db.upsert_slope(&slope).await?;

        report.modified += 1;
        report.restored_images += restores.len();
        Ok(())
    }

    async fn restore_comment(
        &self,
        backup: &CommentImageBackup,
        report: &mut RestoreReport,
    ) -> Result<(), AppError> {
        let Some(mut comment) = self.db.get_comment(&backup.comment_id).await? else {
            report
                .orphaned
                .push(format!("{}/{}", backup.history_number, backup.comment_id));
            return Ok(());
        };
        report.found += 1;

        // List-based owner: restore only when the primary list is empty
        // and the shadow still has something to offer.
        if !comment.image_urls.is_empty() || backup.image_urls.is_empty() {
            return Ok(());
        }

        comment.image_urls = backup.image_urls.clone();
        comment.updated_at = chrono::Utc::now().to_rfc3339();
        self.db.upsert_comment(&comment).await?;

        report.modified += 1;
        report.restored_images += backup.image_urls.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(url: &str) -> ImageRef {
        ImageRef {
            url: url.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_plan_restores_only_empty_slots() {
        let mut primary = SlopeImageSet::default();
        primary.set(ImageSlot::Position, Some(image("primary/position.jpg")));

        let mut shadow = SlopeImageSet::default();
        shadow.set(ImageSlot::Position, Some(image("shadow/position.jpg")));
        shadow.set(ImageSlot::Overview, Some(image("shadow/overview.jpg")));

        let plan = plan_slot_restores(&primary, &shadow);

        // Occupied primary slot is never overwritten; only the missing
        // overview comes back.
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].0, ImageSlot::Overview);
        assert_eq!(plan[0].1.url, "shadow/overview.jpg");
    }

    #[test]
    fn test_plan_restores_nothing_when_shadow_empty() {
        let primary = SlopeImageSet::default();
        let shadow = SlopeImageSet::default();
        assert!(plan_slot_restores(&primary, &shadow).is_empty());
    }

    #[test]
    fn test_plan_restores_all_four_slots() {
        let primary = SlopeImageSet::default();
        let mut shadow = SlopeImageSet::default();
        for slot in ImageSlot::ALL {
            shadow.set(slot, Some(image(slot.as_str())));
        }
        assert_eq!(plan_slot_restores(&primary, &shadow).len(), 4);
    }

    #[tokio::test]
    async fn test_reconcile_with_no_shadow_records_is_noop() {
        // Offline store: any lookup would fail, so a zeroed report also
        // proves no store access happened.
        let service = ImageBackupService::new(FirestoreDb::new_mock());

        let report = service.reconcile(Vec::new(), Vec::new()).await;

        assert_eq!(report.examined, 0);
        assert_eq!(report.found, 0);
        assert_eq!(report.modified, 0);
        assert_eq!(report.restored_images, 0);
        assert!(report.orphaned.is_empty());
        assert!(report.errors.is_empty());
    }
}
