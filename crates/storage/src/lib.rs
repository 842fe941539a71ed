//! Blob storage layer over S3-compatible object stores.
//!
//! Three buckets: raw originals keyed by content hash, processed
//! (aligned) frames, and finished movie artifacts. Object names equal
//! the photo's hex SHA-256 hash, so re-uploads overwrite identical
//! content.

use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to put object {key} into {bucket}: {message}")]
    Put {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("failed to get object {key} from {bucket}: {message}")]
    Get {
        bucket: String,
        key: String,
        message: String,
    },
}

/// Bucket names for the three artifact tiers.
#[derive(Debug, Clone)]
pub struct Buckets {
    pub raw: String,
    pub processed: String,
    pub movies: String,
}

/// Thin client over the S3 API scoped to the project's buckets.
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    buckets: Buckets,
}

impl ObjectStore {
    /// Build a store from the ambient AWS environment (credentials,
    /// region, endpoint overrides).
    pub async fn from_env(buckets: Buckets) -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&config),
            buckets,
        }
    }

    pub fn with_client(client: Client, buckets: Buckets) -> Self {
        Self { client, buckets }
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Upload a raw original under its content hash.
    pub async fn put_raw(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.put(&self.buckets.raw, key, body).await
    }

    /// Upload an aligned frame.
    pub async fn put_processed(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.put(&self.buckets.processed, key, body).await
    }

    /// Upload a finished movie or its companion overlay.
    pub async fn put_movie(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.put(&self.buckets.movies, key, body).await
    }

    /// Download a raw original.
    pub async fn get_raw(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get(&self.buckets.raw, key).await
    }

    /// Download an aligned frame.
    pub async fn get_processed(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get(&self.buckets.processed, key).await
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Put {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?;
        debug!(bucket, key, size, "stored object");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Get {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?;
        let bytes = output.body.collect().await.map_err(|e| StorageError::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(bytes.into_bytes().to_vec())
    }
}
