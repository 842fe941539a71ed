//! Worker configuration from the environment.
//!
//! | Variable                 | Default                      | Meaning                                   |
//! |--------------------------|------------------------------|-------------------------------------------|
//! | `DATABASE_URL`           | required                     | Postgres connection string                |
//! | `WATCH_DIR`              | `/pending-uploads`           | upload daemon watch directory             |
//! | `NOT_READY_SUFFIX`       | `.tmp`                       | suffix marking in-progress files          |
//! | `RAW_BUCKET`             | `megamovie-raw`              | originals bucket                          |
//! | `PROCESSED_BUCKET`       | `megamovie-processed`        | aligned frames bucket                     |
//! | `MOVIE_BUCKET`           | `megamovie-movies`           | artifacts bucket                          |
//! | `PATH_DATA_FILE`         | required                     | NASA path table for the eclipse geometry  |
//! | `MAPS_API_KEY`           | required                     | Time Zone API key for timestamp repair    |
//! | `REQUIRE_CONFIRMATION`   | `true`                       | hold back unconfirmed submissions         |
//! | `UPLOAD_INTERVAL_SECS`   | `1`                          | upload daemon pass interval               |
//! | `INGEST_INTERVAL_SECS`   | `10`                         | ingestion pass interval                   |
//! | `ASSEMBLY_INTERVAL_SECS` | `10`                         | assembly pass interval                    |
//! | `REPAIR_INTERVAL_SECS`   | `60`                         | GPS/time repair pass interval             |
//! | `MAX_UPLOAD_WORKERS`     | `8`                          | upload pool ceiling                       |
//! | `MAX_DOWNLOAD_WORKERS`   | `64`                         | assembly download pool ceiling            |
//! | `MIN_MOVIE_FRAMES`       | `0`                          | discard movies at or below this size      |
//! | `MOVIE_FRAMERATE`        | `2`                          | encoder input framerate                   |
//! | `CLUSTER_EPS_DEGREES`    | 90 km in degrees             | DBSCAN neighborhood radius                |
//! | `CLUSTER_MIN_SAMPLES`    | `100`                        | DBSCAN core-point threshold               |
//! | `WORK_DIR`               | `/tmp`                       | encoder scratch directory                 |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use megamovie_core::cluster::{DEFAULT_EPS_DEGREES, DEFAULT_MIN_SAMPLES};
use megamovie_storage::Buckets;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub watch_dir: PathBuf,
    pub not_ready_suffix: String,
    pub buckets: Buckets,
    pub path_data_file: PathBuf,
    pub maps_api_key: String,
    pub require_confirmation: bool,
    pub upload_interval: Duration,
    pub ingest_interval: Duration,
    pub assembly_interval: Duration,
    pub repair_interval: Duration,
    pub max_upload_workers: usize,
    pub max_download_workers: usize,
    pub min_movie_frames: usize,
    pub movie_framerate: u32,
    pub cluster_eps: f64,
    pub cluster_min_samples: usize,
    pub work_dir: PathBuf,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {name}: {raw}")),
        Err(_) => Ok(default),
    }
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            watch_dir: PathBuf::from(var_or("WATCH_DIR", "/pending-uploads")),
            not_ready_suffix: var_or("NOT_READY_SUFFIX", ".tmp"),
            buckets: Buckets {
                raw: var_or("RAW_BUCKET", "megamovie-raw"),
                processed: var_or("PROCESSED_BUCKET", "megamovie-processed"),
                movies: var_or("MOVIE_BUCKET", "megamovie-movies"),
            },
            path_data_file: PathBuf::from(
                env::var("PATH_DATA_FILE").context("PATH_DATA_FILE is required")?,
            ),
            maps_api_key: env::var("MAPS_API_KEY").context("MAPS_API_KEY is required")?,
            require_confirmation: parse_var("REQUIRE_CONFIRMATION", true)?,
            upload_interval: Duration::from_secs(parse_var("UPLOAD_INTERVAL_SECS", 1)?),
            ingest_interval: Duration::from_secs(parse_var("INGEST_INTERVAL_SECS", 10)?),
            assembly_interval: Duration::from_secs(parse_var("ASSEMBLY_INTERVAL_SECS", 10)?),
            repair_interval: Duration::from_secs(parse_var("REPAIR_INTERVAL_SECS", 60)?),
            max_upload_workers: parse_var("MAX_UPLOAD_WORKERS", 8)?,
            max_download_workers: parse_var("MAX_DOWNLOAD_WORKERS", 64)?,
            min_movie_frames: parse_var("MIN_MOVIE_FRAMES", 0)?,
            movie_framerate: parse_var("MOVIE_FRAMERATE", 2)?,
            cluster_eps: parse_var("CLUSTER_EPS_DEGREES", DEFAULT_EPS_DEGREES)?,
            cluster_min_samples: parse_var("CLUSTER_MIN_SAMPLES", DEFAULT_MIN_SAMPLES)?,
            work_dir: PathBuf::from(var_or("WORK_DIR", "/tmp")),
        })
    }
}
