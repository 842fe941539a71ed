//! GPS/time repair pass over submission batches.

use sqlx::PgPool;
use tracing::{info, warn};

use megamovie_core::repair::{self, RepairRecord, TimezoneLookup};
use megamovie_db::models::{GpsUpdate, Photo};
use megamovie_db::repositories::PhotoRepo;

use crate::error::PipelineError;

/// Run repair over every batch that still has an incomplete photo.
/// A batch whose timezone lookup fails is left for the next pass;
/// store errors abort.
pub async fn run_pass(pool: &PgPool, tz: &dyn TimezoneLookup) -> Result<usize, PipelineError> {
    let batches = PhotoRepo::list_batches_needing_repair(pool).await?;
    let mut repaired = 0;
    for batch in batches {
        match repair_batch(pool, tz, &batch).await {
            Ok(n) => repaired += n,
            Err(e @ PipelineError::Db(_)) => return Err(e),
            Err(e) => warn!(batch, error = %e, "batch repair deferred"),
        }
    }
    Ok(repaired)
}

/// Repair one submission batch: borrow coordinates from the trust
/// source, rebuild missing capture timestamps, and write back only the
/// records that changed.
pub async fn repair_batch(
    pool: &PgPool,
    tz: &dyn TimezoneLookup,
    submission_batch_id: &str,
) -> Result<usize, PipelineError> {
    let photos = PhotoRepo::list_by_batch(pool, submission_batch_id).await?;
    let records: Vec<RepairRecord> = photos.iter().map(to_record).collect();
    let (complete, mut incomplete) = repair::partition(records);

    let before = incomplete.clone();
    let trust_source = repair::choose_trust_source(&complete);
    let changed = repair::repair_incomplete(trust_source, &mut incomplete, tz).await?;
    if changed == 0 {
        return Ok(0);
    }

    let updates: Vec<GpsUpdate> = incomplete
        .iter()
        .zip(&before)
        .filter(|(after, before)| after != before)
        .map(|(after, _)| GpsUpdate {
            id: after.id.clone(),
            lat: after.lat,
            lon: after.lon,
            capture_timestamp: after.capture_timestamp,
            timestamp_repaired: after.timestamp_repaired,
        })
        .collect();
    PhotoRepo::update_gps(pool, &updates).await?;
    info!(batch = submission_batch_id, count = updates.len(), "repaired photo metadata");
    Ok(changed)
}

fn to_record(photo: &Photo) -> RepairRecord {
    RepairRecord {
        id: photo.id.clone(),
        lat: photo.lat,
        lon: photo.lon,
        capture_timestamp: photo.capture_timestamp,
        camera_clock_timestamp: photo.camera_clock_timestamp,
        timestamp_repaired: photo.timestamp_repaired,
    }
}
