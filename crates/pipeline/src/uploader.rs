//! Upload/retry daemon pass.
//!
//! Moves ready files from the watch directory into the raw bucket,
//! records their status, and heals the four failure categories a pass
//! can leave behind. Files are named by content hash, so a retried
//! upload overwrites identical bytes and re-running a pass is safe.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use megamovie_db::repositories::PhotoRepo;
use megamovie_storage::ObjectStore;

use crate::error::PipelineError;

/// Where uploaded bytes and status records go. A seam so passes can be
/// exercised against an in-memory double.
#[async_trait]
pub trait UploadBackend: Send + Sync + 'static {
    /// Put the file's bytes into durable storage under its hash key.
    async fn store_object(&self, key: &str, body: Vec<u8>) -> Result<(), PipelineError>;
    /// Record that these photos now live in durable storage.
    async fn record_stored(&self, ids: &[String]) -> Result<(), PipelineError>;
    /// Record that these photos failed to reach durable storage.
    async fn record_failed(&self, ids: &[String]) -> Result<(), PipelineError>;
}

/// Production backend: raw bucket plus the photos table.
pub struct StoreBackend {
    pub pool: PgPool,
    pub store: ObjectStore,
}

#[async_trait]
impl UploadBackend for StoreBackend {
    async fn store_object(&self, key: &str, body: Vec<u8>) -> Result<(), PipelineError> {
        self.store.put_raw(key, body).await?;
        Ok(())
    }

    async fn record_stored(&self, ids: &[String]) -> Result<(), PipelineError> {
        PhotoRepo::mark_stored(&self.pool, ids).await?;
        Ok(())
    }

    async fn record_failed(&self, ids: &[String]) -> Result<(), PipelineError> {
        PhotoRepo::mark_upload_failed(&self.pool, ids).await?;
        Ok(())
    }
}

/// Per-pass failure ledger, one disjoint list per category.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadErrors {
    /// The blob put (or the local read feeding it) failed.
    pub failed_to_upload: Vec<PathBuf>,
    /// Upload succeeded but the local copy would not delete.
    pub failed_to_delete_local: Vec<PathBuf>,
    /// Upload succeeded but the success record did not persist.
    pub recorded_success_but_persist_failed: Vec<String>,
    /// Upload failed and the failure record did not persist either.
    pub recorded_failure_but_persist_failed: Vec<String>,
}

impl UploadErrors {
    pub fn is_empty(&self) -> bool {
        self.failed_to_upload.is_empty()
            && self.failed_to_delete_local.is_empty()
            && self.recorded_success_but_persist_failed.is_empty()
            && self.recorded_failure_but_persist_failed.is_empty()
    }
}

/// List ready files in the watch directory: regular files whose name
/// does not end in the not-ready suffix. Sorted for a deterministic
/// pass order.
pub async fn scan(dir: &Path, not_ready_suffix: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(not_ready_suffix) {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

/// Single-pass uploader over a backend, with a bounded worker pool.
pub struct Uploader<B> {
    backend: Arc<B>,
    max_workers: usize,
}

impl<B: UploadBackend> Uploader<B> {
    pub fn new(backend: B, max_workers: usize) -> Self {
        Self {
            backend: Arc::new(backend),
            max_workers: max_workers.max(1),
        }
    }

    /// One full pass: scan, upload, then heal whatever the upload left
    /// behind. Returns the failures still outstanding after healing;
    /// they stay on disk (or in the ledger) for the next pass.
    pub async fn run_pass(
        &self,
        dir: &Path,
        not_ready_suffix: &str,
    ) -> Result<UploadErrors, PipelineError> {
        let files = scan(dir, not_ready_suffix).await?;
        if files.is_empty() {
            return Ok(UploadErrors::default());
        }
        info!(count = files.len(), "starting upload pass");
        let errors = self.upload(&files).await;
        Ok(self.heal(errors).await)
    }

    /// Upload a batch with at most `min(batch, max_workers)` uploads
    /// in flight. Successful uploads have their local copy deleted and
    /// their status recorded; every failure lands in exactly one
    /// ledger list.
    pub async fn upload(&self, files: &[PathBuf]) -> UploadErrors {
        let mut errors = UploadErrors::default();
        if files.is_empty() {
            return errors;
        }

        let workers = files.len().min(self.max_workers);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for path in files {
            let path = path.clone();
            let backend = Arc::clone(&self.backend);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // Holding the permit for the whole read+put bounds
                // both memory and connections.
                let _permit = semaphore.acquire_owned().await;
                let key = object_key(&path);
                let result = match tokio::fs::read(&path).await {
                    Ok(body) => backend.store_object(&key, body).await,
                    Err(e) => Err(PipelineError::Io(e)),
                };
                (path, key, result)
            });
        }

        let mut uploaded: Vec<(PathBuf, String)> = Vec::new();
        let mut failed_ids: Vec<String> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, key, Ok(()))) => uploaded.push((path, key)),
                Ok((path, key, Err(e))) => {
                    warn!(path = %path.display(), error = %e, "upload failed");
                    errors.failed_to_upload.push(path);
                    failed_ids.push(key);
                }
                Err(e) => warn!(error = %e, "upload task panicked"),
            }
        }
        uploaded.sort();
        errors.failed_to_upload.sort();
        failed_ids.sort();

        let mut stored_ids = Vec::with_capacity(uploaded.len());
        for (path, key) in &uploaded {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "local delete failed");
                errors.failed_to_delete_local.push(path.clone());
            }
            stored_ids.push(key.clone());
        }

        if !stored_ids.is_empty() {
            if let Err(e) = self.backend.record_stored(&stored_ids).await {
                warn!(error = %e, "recording upload successes failed");
                errors.recorded_success_but_persist_failed = stored_ids;
            }
        }
        if !failed_ids.is_empty() {
            if let Err(e) = self.backend.record_failed(&failed_ids).await {
                warn!(error = %e, "recording upload failures failed");
                errors.recorded_failure_but_persist_failed = failed_ids;
            }
        }

        errors
    }

    /// Retry each ledger list with the outcome it originally intended.
    /// Healing an empty ledger touches neither the network nor the
    /// store. Whatever still fails is returned for the next pass.
    pub async fn heal(&self, errors: UploadErrors) -> UploadErrors {
        if errors.is_empty() {
            return errors;
        }
        let mut leftover = self.upload(&errors.failed_to_upload).await;

        for path in errors.failed_to_delete_local {
            // The upload already succeeded; only the local copy lingers.
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "local delete retry failed");
                leftover.failed_to_delete_local.push(path);
            }
        }

        let ids = errors.recorded_success_but_persist_failed;
        if !ids.is_empty() {
            if let Err(e) = self.backend.record_stored(&ids).await {
                warn!(error = %e, "success record retry failed");
                leftover.recorded_success_but_persist_failed.extend(ids);
            }
        }
        let ids = errors.recorded_failure_but_persist_failed;
        if !ids.is_empty() {
            if let Err(e) = self.backend.record_failed(&ids).await {
                warn!(error = %e, "failure record retry failed");
                leftover.recorded_failure_but_persist_failed.extend(ids);
            }
        }

        leftover
    }
}

fn object_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend double that fails uploads for configured keys and
    /// counts every call.
    #[derive(Default)]
    struct FakeBackend {
        fail_uploads: HashSet<String>,
        calls: AtomicUsize,
        stored: Mutex<Vec<String>>,
        recorded_stored: Mutex<Vec<String>>,
        recorded_failed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UploadBackend for FakeBackend {
        async fn store_object(&self, key: &str, _body: Vec<u8>) -> Result<(), PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_uploads.contains(key) {
                return Err(PipelineError::Io(std::io::Error::other("refused")));
            }
            self.stored.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn record_stored(&self, ids: &[String]) -> Result<(), PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.recorded_stored.lock().unwrap().extend_from_slice(ids);
            Ok(())
        }

        async fn record_failed(&self, ids: &[String]) -> Result<(), PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.recorded_failed.lock().unwrap().extend_from_slice(ids);
            Ok(())
        }
    }

    fn write_files(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"pixels").unwrap();
        }
    }

    #[tokio::test]
    async fn scan_skips_not_ready_files() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["aaa", "bbb", "ccc.tmp"]);

        let files = scan(dir.path(), ".tmp").await.unwrap();
        let names: Vec<String> = files.iter().map(|p| object_key(p)).collect();
        assert_eq!(names, vec!["aaa", "bbb"]);
    }

    #[tokio::test]
    async fn heal_of_empty_ledger_makes_no_calls() {
        let uploader = Uploader::new(FakeBackend::default(), 4);
        let leftover = uploader.heal(UploadErrors::default()).await;
        assert!(leftover.is_empty());
        assert_eq!(uploader.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mixed_batch_buckets_failures_and_finishes_successes() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["f1", "f2", "f3", "f4", "f5"]);

        let backend = FakeBackend {
            fail_uploads: ["f2".to_string(), "f4".to_string()].into(),
            ..FakeBackend::default()
        };
        let uploader = Uploader::new(backend, 4);
        let files = scan(dir.path(), ".tmp").await.unwrap();
        let errors = uploader.upload(&files).await;

        let failed: Vec<String> = errors.failed_to_upload.iter().map(|p| object_key(p)).collect();
        assert_eq!(failed, vec!["f2", "f4"]);
        assert!(errors.failed_to_delete_local.is_empty());
        assert!(errors.recorded_success_but_persist_failed.is_empty());
        assert!(errors.recorded_failure_but_persist_failed.is_empty());

        // Still-failing uploads keep their local copies for healing.
        let leftover = uploader.heal(errors).await;
        let failed: Vec<String> =
            leftover.failed_to_upload.iter().map(|p| object_key(p)).collect();
        assert_eq!(failed, vec!["f2", "f4"]);

        // The three successes are gone locally and recorded exactly once.
        for name in ["f1", "f3", "f5"] {
            assert!(!dir.path().join(name).exists());
        }
        for name in ["f2", "f4"] {
            assert!(dir.path().join(name).exists());
        }
        let recorded = uploader.backend.recorded_stored.lock().unwrap().clone();
        assert_eq!(recorded, vec!["f1", "f3", "f5"]);
        let recorded_failed = uploader.backend.recorded_failed.lock().unwrap().clone();
        // Once from the pass, once from the heal retry.
        assert_eq!(recorded_failed, vec!["f2", "f4", "f2", "f4"]);
    }

    #[tokio::test]
    async fn heal_retries_uploads_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["g1", "g2"]);

        // Fails nothing; simulates a transient fault that cleared.
        let uploader = Uploader::new(FakeBackend::default(), 2);
        let errors = UploadErrors {
            failed_to_upload: vec![dir.path().join("g1"), dir.path().join("g2")],
            ..UploadErrors::default()
        };
        let leftover = uploader.heal(errors).await;
        assert!(leftover.is_empty());
        assert!(!dir.path().join("g1").exists());
        let recorded = uploader.backend.recorded_stored.lock().unwrap().clone();
        assert_eq!(recorded, vec!["g1", "g2"]);
    }

    #[tokio::test]
    async fn worker_pool_never_exceeds_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["solo"]);
        let uploader = Uploader::new(FakeBackend::default(), 64);
        let errors = uploader.upload(&[dir.path().join("solo")]).await;
        assert!(errors.is_empty());
    }
}
