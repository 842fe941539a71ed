//! Pipeline error taxonomy.
//!
//! Every failure in a pass maps to one of three kinds, and each kind to
//! one retry policy. Transient faults are retried by the next scheduled
//! pass; unusable inputs are skipped; fatal faults abort the pass and
//! leave the store untouched past the last commit.

use megamovie_core::CoreError;
use megamovie_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encode failed: {0}")]
    ImageEncode(#[from] image::ImageError),

    #[error("encoder exited abnormally (exit code {exit_code:?}): {stderr}")]
    Encoder {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("stored bytes for {id} hash to {actual}")]
    IntegrityMismatch { id: String, actual: String },
}

/// Broad failure classes a pass distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Environment fault likely to clear on its own (network, disk).
    Transient,
    /// The input itself is defective; retrying cannot help.
    Unusable,
    /// The pass cannot continue safely.
    Fatal,
}

/// What a pass does after classifying a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Leave the item eligible; the next scheduled pass picks it up.
    RetryNextPass,
    /// Log and move on to the next item.
    Skip,
    /// Stop the pass; nothing after the last commit is written.
    AbortPass,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(CoreError::Timezone(_)) => ErrorKind::Transient,
            Self::Core(_) | Self::ImageEncode(_) | Self::IntegrityMismatch { .. } => {
                ErrorKind::Unusable
            }
            Self::Storage(_) | Self::Io(_) => ErrorKind::Transient,
            Self::Db(_) | Self::Encoder { .. } => ErrorKind::Fatal,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        match self.kind() {
            ErrorKind::Transient => RetryPolicy::RetryNextPass,
            ErrorKind::Unusable => RetryPolicy::Skip,
            ErrorKind::Fatal => RetryPolicy::AbortPass,
        }
    }
}
