//! Movie assembly pass: scan, download, encode, publish.
//!
//! The frame list from the previous pass is an explicit checkpoint
//! value passed in and returned, so a restarted process simply rebuilds
//! once instead of carrying hidden state.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use image::ImageFormat;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use megamovie_core::cluster;
use megamovie_core::geometry::EclipsePath;
use megamovie_core::types::Point;
use megamovie_db::models::AssemblyFrame;
use megamovie_db::repositories::{FrameRepo, MovieRepo};
use megamovie_storage::ObjectStore;

use crate::encoder::{EncoderSettings, MovieEncoder};
use crate::error::PipelineError;
use crate::overlay;

/// Tunables for one assembly pass.
#[derive(Debug, Clone)]
pub struct AssemblySettings {
    /// A movie below this many frames is discarded, not published.
    pub min_frames: usize,
    pub framerate: u32,
    pub max_workers: usize,
    pub cluster_eps: f64,
    pub cluster_min_samples: usize,
    /// Scratch directory for the encoder output file.
    pub work_dir: PathBuf,
}

pub struct AssemblyContext {
    pub pool: PgPool,
    pub store: ObjectStore,
    pub path: EclipsePath,
    pub settings: AssemblySettings,
}

/// Outcome of a pass: the published movie name (if any) and the frame
/// checkpoint to hand to the next pass.
pub struct AssemblyOutcome {
    pub movie: Option<String>,
    pub checkpoint: Vec<String>,
}

/// One assembly pass. `checkpoint` is the frame identity list the
/// previous pass saw; an identical scan is a no-op.
pub async fn run_pass(
    ctx: &AssemblyContext,
    checkpoint: &[String],
) -> Result<AssemblyOutcome, PipelineError> {
    let frames = FrameRepo::list_totality_ordered(&ctx.pool).await?;
    let ids: Vec<String> = frames.iter().map(|f| f.id.clone()).collect();
    if ids == checkpoint {
        return Ok(AssemblyOutcome {
            movie: None,
            checkpoint: ids,
        });
    }
    info!(frames = ids.len(), "starting assembly pass");

    let downloads = download_frames(ctx, &frames).await;

    let output = ctx.settings.work_dir.join("movie.mp4");
    let mut encoder = MovieEncoder::spawn(&EncoderSettings {
        framerate: ctx.settings.framerate,
        output: output.clone(),
    })?;

    // Stream in ordering-key order; frames that failed to download are
    // simply absent from this movie.
    let mut contributing: Vec<String> = Vec::new();
    let mut streamed_frames: Vec<&AssemblyFrame> = Vec::new();
    for frame in &frames {
        if let Some(png) = downloads.get(&frame.id) {
            encoder.write_frame(png).await?;
            contributing.push(frame.photo_id.clone());
            streamed_frames.push(frame);
        }
    }

    if encoder.frames_written() <= ctx.settings.min_frames {
        info!(
            frames = contributing.len(),
            min = ctx.settings.min_frames,
            "too few frames, discarding movie"
        );
        encoder.abort(&output).await?;
        return Ok(AssemblyOutcome {
            movie: None,
            checkpoint: ids,
        });
    }
    encoder.finish().await?;

    let map_png = render_map(ctx, &streamed_frames)?;
    let stamp = artifact_stamp(Utc::now());
    let movie_name = format!("movie-{stamp}.mp4");
    let map_name = format!("map-{stamp}.png");

    let movie_bytes = tokio::fs::read(&output).await?;
    ctx.store.put_movie(&movie_name, movie_bytes).await?;
    ctx.store.put_movie(&map_name, map_png).await?;
    MovieRepo::insert(&ctx.pool, &movie_name, &contributing).await?;
    tokio::fs::remove_file(&output).await?;

    info!(movie = movie_name, frames = contributing.len(), "published movie");
    Ok(AssemblyOutcome {
        movie: Some(movie_name),
        checkpoint: ids,
    })
}

/// Fetch processed frames with a pool of `min(count, max_workers)`
/// downloads in flight. A failed fetch excludes the frame from this
/// movie only.
async fn download_frames(
    ctx: &AssemblyContext,
    frames: &[AssemblyFrame],
) -> HashMap<String, Vec<u8>> {
    let mut downloads = HashMap::with_capacity(frames.len());
    if frames.is_empty() {
        return downloads;
    }
    let workers = frames.len().min(ctx.settings.max_workers).max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    for frame in frames {
        let id = frame.id.clone();
        let store = ctx.store.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = store.get_processed(&format!("{id}.png")).await;
            (id, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, Ok(bytes))) => {
                downloads.insert(id, bytes);
            }
            Ok((id, Err(e))) => warn!(id, error = %e, "frame fetch failed, excluded"),
            Err(e) => warn!(error = %e, "download task panicked"),
        }
    }
    downloads
}

/// UTC timestamp for artifact names, down to the second so back-to-back
/// publishes never collide on the `movies` primary key.
fn artifact_stamp(now: chrono::DateTime<Utc>) -> String {
    now.format("%Y-%m-%d-%H%M%S").to_string()
}

/// Cluster the streamed frames' shooting locations and render the
/// companion map as PNG bytes.
fn render_map(ctx: &AssemblyContext, frames: &[&AssemblyFrame]) -> Result<Vec<u8>, PipelineError> {
    let points: Vec<Point> = frames
        .iter()
        .filter_map(|f| match (f.lat, f.lon) {
            // Stored longitudes carry the flipped sign convention.
            (Some(lat), Some(lon)) => Some((lat, -lon)),
            _ => None,
        })
        .collect();
    let labels = cluster::cluster_points(
        &points,
        ctx.settings.cluster_eps,
        ctx.settings.cluster_min_samples,
        ctx.settings.max_workers,
    );
    let (centers, sizes) = cluster::compute_centers(&labels, &points, true);

    let map = overlay::render_cluster_map(&ctx.path, &centers, &sizes);
    let mut png = Vec::new();
    map.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn artifact_stamps_a_second_apart_differ() {
        let first = Utc.with_ymd_and_hms(2017, 8, 21, 17, 20, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2017, 8, 21, 17, 20, 1).unwrap();
        assert_eq!(artifact_stamp(first), "2017-08-21-172000");
        assert_ne!(artifact_stamp(first), artifact_stamp(second));
    }
}
