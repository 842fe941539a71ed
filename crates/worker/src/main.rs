use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use megamovie_core::geometry::EclipsePath;
use megamovie_core::path_data;
use megamovie_pipeline::assembly::{AssemblyContext, AssemblySettings};
use megamovie_pipeline::ingest::IngestContext;
use megamovie_pipeline::timezone::MapsTimezoneClient;
use megamovie_pipeline::uploader::{StoreBackend, Uploader};
use megamovie_storage::ObjectStore;
use megamovie_worker::config::WorkerConfig;
use megamovie_worker::loops;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "megamovie_worker=debug,megamovie_pipeline=debug,megamovie_db=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    let pool = megamovie_db::create_pool(&config.database_url).await?;
    sqlx::migrate!("../db/migrations").run(&pool).await?;
    let store = ObjectStore::from_env(config.buckets.clone()).await;

    let table = tokio::fs::read_to_string(&config.path_data_file).await?;
    let samples = path_data::parse_limits(table.lines());
    let path = EclipsePath::from_samples(&samples);
    anyhow::ensure!(
        !path.centerline().is_empty(),
        "no usable samples in {}",
        config.path_data_file.display()
    );
    tracing::info!(
        samples = samples.len(),
        "loaded eclipse path geometry"
    );

    let cancel = CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();

    let uploader = Uploader::new(
        StoreBackend {
            pool: pool.clone(),
            store: store.clone(),
        },
        config.max_upload_workers,
    );
    tasks.spawn(loops::upload(
        uploader,
        config.watch_dir.clone(),
        config.not_ready_suffix.clone(),
        config.upload_interval,
        cancel.clone(),
    ));

    tasks.spawn(loops::ingest(
        IngestContext {
            pool: pool.clone(),
            store: store.clone(),
            path: path.clone(),
            require_confirmation: config.require_confirmation,
        },
        config.ingest_interval,
        cancel.clone(),
    ));

    tasks.spawn(loops::assemble(
        AssemblyContext {
            pool: pool.clone(),
            store,
            path,
            settings: AssemblySettings {
                min_frames: config.min_movie_frames,
                framerate: config.movie_framerate,
                max_workers: config.max_download_workers,
                cluster_eps: config.cluster_eps,
                cluster_min_samples: config.cluster_min_samples,
                work_dir: config.work_dir.clone(),
            },
        },
        config.assembly_interval,
        cancel.clone(),
    ));

    tasks.spawn(loops::repair(
        pool,
        Box::new(MapsTimezoneClient::new(config.maps_api_key.clone())),
        config.repair_interval,
        cancel.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    cancel.cancel();
    while tasks.join_next().await.is_some() {}
    Ok(())
}
