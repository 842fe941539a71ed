//! Image ingestion pass: detect, align, classify, record.
//!
//! Scans for photos that landed in the raw bucket but have no aligned
//! frame yet, runs sun-disk detection and canonical alignment, stores
//! the processed frame, and commits the flag flip and the oriented
//! image together.

use std::io::Cursor;

use image::ImageFormat;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use megamovie_core::geometry::EclipsePath;
use megamovie_core::{align, circle, CoreError};
use megamovie_db::models::{FrameClass, NewOrientedImage, Photo};
use megamovie_db::repositories::PhotoRepo;
use megamovie_storage::ObjectStore;

use crate::error::{PipelineError, RetryPolicy};

/// Everything one ingestion pass needs.
pub struct IngestContext {
    pub pool: PgPool,
    pub store: ObjectStore,
    pub path: EclipsePath,
    /// Hold back submissions the uploader has not confirmed yet.
    pub require_confirmation: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub aligned: usize,
    /// Unusable inputs, skipped this pass and every later one until an
    /// operator blacklists them.
    pub skipped: usize,
    /// Transient failures, eligible again next pass.
    pub deferred: usize,
}

/// One ingestion pass. A single photo's failure never aborts the
/// batch; only store faults do.
pub async fn run_pass(ctx: &IngestContext) -> Result<IngestStats, PipelineError> {
    let ids = PhotoRepo::list_unaligned_ids(&ctx.pool, ctx.require_confirmation).await?;
    if ids.is_empty() {
        return Ok(IngestStats::default());
    }
    info!(count = ids.len(), "starting ingestion pass");

    let mut stats = IngestStats::default();
    for id in &ids {
        match ingest_one(ctx, id).await {
            Ok(()) => stats.aligned += 1,
            Err(e) => match e.policy() {
                RetryPolicy::AbortPass => return Err(e),
                RetryPolicy::Skip => {
                    debug!(id, error = %e, "photo unusable, skipping");
                    stats.skipped += 1;
                }
                RetryPolicy::RetryNextPass => {
                    warn!(id, error = %e, "photo deferred to next pass");
                    stats.deferred += 1;
                }
            },
        }
    }
    info!(?stats, "ingestion pass finished");
    Ok(stats)
}

async fn ingest_one(ctx: &IngestContext, id: &str) -> Result<(), PipelineError> {
    let Some(photo) = PhotoRepo::find_by_id(&ctx.pool, id).await? else {
        // Record vanished between scan and fetch.
        return Ok(());
    };

    let bytes = ctx.store.get_raw(id).await?;
    // The id is the content hash; bytes that no longer hash to it are
    // corrupt and can never align usefully.
    let actual = megamovie_core::hashing::sha256_hex(&bytes);
    if actual != id {
        return Err(PipelineError::IntegrityMismatch {
            id: id.to_string(),
            actual,
        });
    }
    let img = image::load_from_memory(&bytes).map_err(CoreError::from)?;
    let disk = circle::find_sun_disk(&img)?;
    let frame = align::align_to_canonical(&img, &disk)?;

    let mut png = Vec::new();
    frame.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    let key = format!("{id}.png");
    ctx.store.put_processed(&key, png).await?;

    let (frame_class, ordering_key) = orient(&ctx.path, &photo);
    PhotoRepo::mark_aligned(
        &ctx.pool,
        &NewOrientedImage {
            id: id.to_string(),
            photo_id: id.to_string(),
            frame_class_id: frame_class.id(),
            ordering_key,
        },
    )
    .await?;
    Ok(())
}

/// Classify a photo against the path of totality and compute its
/// west-to-east ordering key. Stored longitudes carry the flipped sign
/// convention of the path table, so they are negated before any
/// geometry. Photos without coordinates cannot join a movie; they file
/// under the midpoint so the key stays in range.
fn orient(path: &EclipsePath, photo: &Photo) -> (FrameClass, f64) {
    match (photo.lat, photo.lon) {
        (Some(lat), Some(lon)) => {
            let point = (lat, -lon);
            let class = if path.contains(point) {
                FrameClass::TotalityFullDisk
            } else {
                FrameClass::Other
            };
            (class, path.project_normalized(point))
        }
        _ => (FrameClass::Other, 0.5),
    }
}
