//! Integration tests for the photo store repositories.
//!
//! Exercises the repository layer against a real database:
//! - Upload-status upsert (bytes arriving before metadata, failure healing)
//! - Aligned flag and oriented image committed together
//! - GPS/time repair write-back
//! - Assembly frame scan ordering and exclusions

use sqlx::PgPool;

use megamovie_core::types::Timestamp;
use megamovie_db::models::{FrameClass, GpsUpdate, NewOrientedImage};
use megamovie_db::repositories::{FrameRepo, PhotoRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn totality_frame(id: &str, ordering_key: f64) -> NewOrientedImage {
    NewOrientedImage {
        id: id.to_string(),
        photo_id: id.to_string(),
        frame_class_id: FrameClass::TotalityFullDisk.id(),
        ordering_key,
    }
}

// ---------------------------------------------------------------------------
// Test: upload-status upsert creates rows that do not exist yet
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_mark_stored_creates_missing_rows(pool: PgPool) {
    PhotoRepo::mark_stored(&pool, &ids(&["a1", "b2"])).await.unwrap();

    let photo = PhotoRepo::find_by_id(&pool, "a1").await.unwrap().unwrap();
    assert!(photo.stored_in_blob);
    assert!(!photo.upload_failed);
    assert!(!photo.aligned);

    let photo = PhotoRepo::find_by_id(&pool, "b2").await.unwrap().unwrap();
    assert!(photo.stored_in_blob);
}

// ---------------------------------------------------------------------------
// Test: a successful upload clears an earlier recorded failure
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_successful_upload_clears_failure_flag(pool: PgPool) {
    PhotoRepo::mark_upload_failed(&pool, &ids(&["a1"])).await.unwrap();
    let photo = PhotoRepo::find_by_id(&pool, "a1").await.unwrap().unwrap();
    assert!(photo.upload_failed);
    assert!(!photo.stored_in_blob);

    PhotoRepo::mark_stored(&pool, &ids(&["a1"])).await.unwrap();
    let photo = PhotoRepo::find_by_id(&pool, "a1").await.unwrap().unwrap();
    assert!(photo.stored_in_blob);
    assert!(!photo.upload_failed, "stored upload should clear the failure flag");
}

// ---------------------------------------------------------------------------
// Test: mark_aligned commits the flag and the frame together
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_mark_aligned_writes_flag_and_frame_together(pool: PgPool) {
    PhotoRepo::mark_stored(&pool, &ids(&["p1"])).await.unwrap();
    PhotoRepo::mark_aligned(&pool, &totality_frame("p1", 0.25))
        .await
        .unwrap();

    let photo = PhotoRepo::find_by_id(&pool, "p1").await.unwrap().unwrap();
    assert!(photo.aligned);

    let frame = FrameRepo::find_by_id(&pool, "p1")
        .await
        .unwrap()
        .expect("aligned photo must have an oriented image row");
    assert_eq!(frame.photo_id, "p1");
    assert_eq!(frame.frame_class_id, FrameClass::TotalityFullDisk.id());
    assert!((frame.ordering_key - 0.25).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Test: re-running mark_aligned keeps the original frame
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_mark_aligned_rerun_keeps_the_original_frame(pool: PgPool) {
    PhotoRepo::mark_stored(&pool, &ids(&["p1"])).await.unwrap();
    PhotoRepo::mark_aligned(&pool, &totality_frame("p1", 0.25))
        .await
        .unwrap();
    PhotoRepo::mark_aligned(&pool, &totality_frame("p1", 0.75))
        .await
        .unwrap();

    let frame = FrameRepo::find_by_id(&pool, "p1").await.unwrap().unwrap();
    assert!(
        (frame.ordering_key - 0.25).abs() < 1e-12,
        "rerun must not overwrite the oriented image"
    );
}

// ---------------------------------------------------------------------------
// Test: GPS/time repair write-back touches only the listed photos
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_update_gps_writes_back_repairs(pool: PgPool) {
    PhotoRepo::mark_stored(&pool, &ids(&["p1", "p2"])).await.unwrap();

    let capture: Timestamp = "2017-08-21T17:20:00Z".parse().unwrap();
    let updates = vec![GpsUpdate {
        id: "p1".to_string(),
        lat: Some(44.5),
        lon: Some(124.3),
        capture_timestamp: Some(capture),
        timestamp_repaired: true,
    }];
    PhotoRepo::update_gps(&pool, &updates).await.unwrap();

    let photo = PhotoRepo::find_by_id(&pool, "p1").await.unwrap().unwrap();
    assert_eq!(photo.lat, Some(44.5));
    assert_eq!(photo.lon, Some(124.3));
    assert_eq!(photo.capture_timestamp, Some(capture));
    assert!(photo.timestamp_repaired);

    let untouched = PhotoRepo::find_by_id(&pool, "p2").await.unwrap().unwrap();
    assert_eq!(untouched.lat, None);
    assert!(!untouched.timestamp_repaired);
}

// ---------------------------------------------------------------------------
// Test: unaligned scan honors the confirmation gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_unaligned_scan_respects_confirmation(pool: PgPool) {
    PhotoRepo::mark_stored(&pool, &ids(&["p1", "p2"])).await.unwrap();
    sqlx::query("UPDATE photos SET confirmed_by_submitter = TRUE WHERE id = 'p1'")
        .execute(&pool)
        .await
        .unwrap();

    let gated = PhotoRepo::list_unaligned_ids(&pool, true).await.unwrap();
    assert_eq!(gated, vec!["p1".to_string()]);

    let mut open = PhotoRepo::list_unaligned_ids(&pool, false).await.unwrap();
    open.sort();
    assert_eq!(open, ids(&["p1", "p2"]));
}

// ---------------------------------------------------------------------------
// Test: assembly scan orders by key and skips blacklisted photos
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_totality_frames_ordered_and_filtered(pool: PgPool) {
    PhotoRepo::mark_stored(&pool, &ids(&["east", "west", "mid", "partial"]))
        .await
        .unwrap();
    PhotoRepo::mark_aligned(&pool, &totality_frame("east", 0.9))
        .await
        .unwrap();
    PhotoRepo::mark_aligned(&pool, &totality_frame("west", 0.1))
        .await
        .unwrap();
    PhotoRepo::mark_aligned(&pool, &totality_frame("mid", 0.5))
        .await
        .unwrap();
    PhotoRepo::mark_aligned(
        &pool,
        &NewOrientedImage {
            id: "partial".to_string(),
            photo_id: "partial".to_string(),
            frame_class_id: FrameClass::Other.id(),
            ordering_key: 0.3,
        },
    )
    .await
    .unwrap();

    let frames = FrameRepo::list_totality_ordered(&pool).await.unwrap();
    let order: Vec<&str> = frames.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(order, vec!["west", "mid", "east"]);

    PhotoRepo::blacklist(&pool, "mid").await.unwrap();
    let frames = FrameRepo::list_totality_ordered(&pool).await.unwrap();
    let order: Vec<&str> = frames.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(order, vec!["west", "east"]);
}
