//! Daemon loops, one per pipeline stage.
//!
//! Each loop runs its pass on a fixed interval until the cancellation
//! token fires. A pass failure is logged and the loop keeps going; the
//! next tick starts from a clean scan.

use std::path::PathBuf;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use megamovie_core::repair::TimezoneLookup;
use megamovie_pipeline::assembly::{self, AssemblyContext};
use megamovie_pipeline::ingest::{self, IngestContext};
use megamovie_pipeline::uploader::{StoreBackend, Uploader};

/// Run the upload/retry daemon loop.
pub async fn upload(
    uploader: Uploader<StoreBackend>,
    watch_dir: PathBuf,
    not_ready_suffix: String,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(dir = %watch_dir.display(), "upload daemon started");
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("upload daemon stopping");
                break;
            }
            _ = interval.tick() => {
                match uploader.run_pass(&watch_dir, &not_ready_suffix).await {
                    Ok(leftover) if leftover.is_empty() => {}
                    Ok(leftover) => {
                        tracing::warn!(?leftover, "upload pass left unhealed failures");
                    }
                    Err(e) => tracing::error!(error = %e, "upload pass failed"),
                }
            }
        }
    }
}

/// Run the image ingestion loop.
pub async fn ingest(ctx: IngestContext, period: Duration, cancel: CancellationToken) {
    tracing::info!("ingestion daemon started");
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("ingestion daemon stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = ingest::run_pass(&ctx).await {
                    tracing::error!(error = %e, "ingestion pass aborted");
                }
            }
        }
    }
}

/// Run the movie assembly loop. The frame checkpoint lives here, in
/// loop-local state handed through each pass; a restart rebuilds once.
pub async fn assemble(ctx: AssemblyContext, period: Duration, cancel: CancellationToken) {
    tracing::info!("assembly daemon started");
    let mut interval = tokio::time::interval(period);
    let mut checkpoint: Vec<String> = Vec::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("assembly daemon stopping");
                break;
            }
            _ = interval.tick() => {
                match assembly::run_pass(&ctx, &checkpoint).await {
                    Ok(outcome) => checkpoint = outcome.checkpoint,
                    Err(e) => tracing::error!(error = %e, "assembly pass aborted"),
                }
            }
        }
    }
}

/// Run the GPS/time repair loop.
pub async fn repair(
    pool: PgPool,
    tz: Box<dyn TimezoneLookup>,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!("repair daemon started");
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("repair daemon stopping");
                break;
            }
            _ = interval.tick() => {
                match megamovie_pipeline::repair::run_pass(&pool, tz.as_ref()).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(repaired = n, "repair pass fixed records"),
                    Err(e) => tracing::error!(error = %e, "repair pass aborted"),
                }
            }
        }
    }
}
