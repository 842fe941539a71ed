//! Pure algorithmic core of the megamovie pipeline.
//!
//! Everything in this crate is deterministic and free of I/O: eclipse
//! path geometry, the NASA path-table parser, density clustering,
//! GPS/time repair logic, sun-disk detection, and canonical frame
//! alignment. The daemon crates own all network, disk, and store access.

pub mod align;
pub mod circle;
pub mod cluster;
pub mod error;
pub mod geometry;
pub mod hashing;
pub mod path_data;
pub mod repair;
pub mod types;

pub use error::CoreError;
