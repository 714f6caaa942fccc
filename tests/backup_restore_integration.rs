// SPDX-License-Identifier: MIT

//! Image backup reconciliation integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at it; they skip otherwise.
//!
//! Tests assert on their own records by unique owner key, so they stay
//! independent of whatever else lives in the emulator.

use slope_registry::models::{Comment, ImageRef, ImageSlot, Slope};
use slope_registry::services::ImageBackupService;

mod common;
use common::test_db;

fn unique_history() -> String {
    format!("H-{}", uuid::Uuid::new_v4())
}

fn test_slope(history_number: &str) -> Slope {
    Slope {
        management_no: format!("M-{}", uuid::Uuid::new_v4()),
        name: "Test slope".to_string(),
        history_number: history_number.to_string(),
        location: Default::default(),
        management: Default::default(),
        inspections: Vec::new(),
        collapse_risk: Default::default(),
        maintenance_project: Default::default(),
        images: Default::default(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn test_comment(history_number: &str, image_urls: Vec<String>) -> Comment {
    let now = chrono::Utc::now().to_rfc3339();
    Comment {
        id: uuid::Uuid::new_v4().to_string(),
        history_number: history_number.to_string(),
        user_id: "user-1".to_string(),
        content: "Inspection note".to_string(),
        image_urls,
        created_at: now.clone(),
        updated_at: now,
    }
}

fn image(url: &str) -> ImageRef {
    ImageRef {
        url: url.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[tokio::test]
async fn test_restore_fills_missing_slot() {
    require_emulator!();

    let db = test_db().await;
    let service = ImageBackupService::new(db.clone());
    let history = unique_history();

    let slope = test_slope(&history);
    db.upsert_slope(&slope).await.unwrap();

    // Shadow write lands; then the primary slot is "lost" (it was never
    // populated), so reconciliation should bring it back.
    service
        .record_slope_upsert(&history, ImageSlot::Overview, image("gs/overview.jpg"))
        .await;

    let report = service.restore_all().await.unwrap();
    assert!(!report.errors.iter().any(|e| e.contains(&history)));

    let restored = db
        .get_slope_by_history_number(&history)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        restored.images.get(ImageSlot::Overview).map(|i| i.url.as_str()),
        Some("gs/overview.jpg")
    );
}

#[tokio::test]
async fn test_restore_report_counts_one_recovered_image() {
    require_emulator!();

    let db = test_db().await;
    let service = ImageBackupService::new(db.clone());
    let history = unique_history();

    db.upsert_slope(&test_slope(&history)).await.unwrap();
    service
        .record_slope_upsert(&history, ImageSlot::Start, image("gs/start.jpg"))
        .await;

    // Drive the walk with exactly our shadow record so the report
    // arithmetic is assertable without interference.
    let backup = db.get_slope_backup(&history).await.unwrap().unwrap();
    let report = service.reconcile(vec![backup], Vec::new()).await;

    assert_eq!(report.examined, 1);
    assert_eq!(report.found, 1);
    assert_eq!(report.modified, 1);
    assert_eq!(report.restored_images, 1);
    assert!(report.orphaned.is_empty());
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_restore_never_overwrites_occupied_slot() {
    require_emulator!();

    let db = test_db().await;
    let service = ImageBackupService::new(db.clone());
    let history = unique_history();

    let mut slope = test_slope(&history);
    slope
        .images
        .set(ImageSlot::Position, Some(image("gs/current.jpg")));
    db.upsert_slope(&slope).await.unwrap();

    // Shadow holds an older reference for the same slot
    service
        .record_slope_upsert(&history, ImageSlot::Position, image("gs/stale.jpg"))
        .await;

    service.restore_all().await.unwrap();

    let after = db
        .get_slope_by_history_number(&history)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        after.images.get(ImageSlot::Position).map(|i| i.url.as_str()),
        Some("gs/current.jpg")
    );
}

#[tokio::test]
async fn test_deleted_slot_stays_deleted() {
    require_emulator!();

    let db = test_db().await;
    let service = ImageBackupService::new(db.clone());
    let history = unique_history();

    db.upsert_slope(&test_slope(&history)).await.unwrap();

    service
        .record_slope_upsert(&history, ImageSlot::Start, image("gs/start.jpg"))
        .await;
    // The image is deleted through the normal path; the shadow slot is
    // cleared too, so reconciliation must not resurrect it.
    service.record_slope_delete(&history, ImageSlot::Start).await;

    service.restore_all().await.unwrap();

    let after = db
        .get_slope_by_history_number(&history)
        .await
        .unwrap()
        .unwrap();
    assert!(after.images.get(ImageSlot::Start).is_none());
}

#[tokio::test]
async fn test_orphaned_backup_reported_not_fatal() {
    require_emulator!();

    let db = test_db().await;
    let service = ImageBackupService::new(db.clone());
    let history = unique_history();

    // Shadow record with no matching slope
    service
        .record_slope_upsert(&history, ImageSlot::End, image("gs/end.jpg"))
        .await;

    let report = service.restore_all().await.unwrap();

    assert!(report.orphaned.contains(&history));
    assert!(!report.errors.iter().any(|e| e.contains(&history)));
}

#[tokio::test]
async fn test_comment_images_restored_when_list_empty() {
    require_emulator!();

    let db = test_db().await;
    let service = ImageBackupService::new(db.clone());
    let history = unique_history();

    let comment = test_comment(&history, Vec::new());
    db.upsert_comment(&comment).await.unwrap();

    service
        .record_comment_images(
            &history,
            &comment.id,
            &["gs/a.jpg".to_string(), "gs/b.jpg".to_string()],
        )
        .await;

    service.restore_all().await.unwrap();

    let after = db.get_comment(&comment.id).await.unwrap().unwrap();
    assert_eq!(after.image_urls, vec!["gs/a.jpg", "gs/b.jpg"]);
}

#[tokio::test]
async fn test_comment_images_untouched_when_list_populated() {
    require_emulator!();

    let db = test_db().await;
    let service = ImageBackupService::new(db.clone());
    let history = unique_history();

    let comment = test_comment(&history, vec!["gs/live.jpg".to_string()]);
    db.upsert_comment(&comment).await.unwrap();

    service
        .record_comment_images(&history, &comment.id, &["gs/old.jpg".to_string()])
        .await;

    service.restore_all().await.unwrap();

    let after = db.get_comment(&comment.id).await.unwrap().unwrap();
    assert_eq!(after.image_urls, vec!["gs/live.jpg"]);
}

#[tokio::test]
async fn test_removed_comment_backup_not_reported_orphaned() {
    require_emulator!();

    let db = test_db().await;
    let service = ImageBackupService::new(db.clone());
    let history = unique_history();

    let comment = test_comment(&history, vec!["gs/x.jpg".to_string()]);
    db.upsert_comment(&comment).await.unwrap();
    service
        .record_comment_images(&history, &comment.id, &comment.image_urls)
        .await;

    // Comment deleted through the normal path drops its shadow record
    db.delete_comment(&comment.id).await.unwrap();
    service.remove_comment_backup(&history, &comment.id).await;

    let report = service.restore_all().await.unwrap();
    let key = format!("{}/{}", history, comment.id);
    assert!(!report.orphaned.contains(&key));
}
