//! Pipeline daemons: upload/retry, image ingestion, and movie assembly.
//!
//! Each module owns one polling pass; the worker binary wires them into
//! interval loops. All store and network access lives here, on top of
//! the pure algorithms in `megamovie-core`.

pub mod assembly;
pub mod encoder;
pub mod error;
pub mod ingest;
pub mod overlay;
pub mod repair;
pub mod timezone;
pub mod uploader;

pub use error::{ErrorKind, PipelineError, RetryPolicy};
