//! Oriented (aligned) image entity models.

use serde::Serialize;
use sqlx::FromRow;

use megamovie_core::types::Timestamp;

use super::class::ClassId;

/// A row from the `oriented_images` table: one per successfully
/// aligned photo, carrying its position along the path of totality.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrientedImage {
    pub id: String,
    pub photo_id: String,
    pub frame_class_id: ClassId,
    /// Normalized projection onto the eclipse centerline, in `[0, 1]`.
    pub ordering_key: f64,
    pub created_at: Timestamp,
}

/// Input for creating an oriented image alongside the aligned flag.
#[derive(Debug, Clone)]
pub struct NewOrientedImage {
    pub id: String,
    pub photo_id: String,
    pub frame_class_id: ClassId,
    pub ordering_key: f64,
}

/// Join row used by movie assembly: frame identity plus the source
/// photo's coordinates for clustering.
#[derive(Debug, Clone, FromRow)]
pub struct AssemblyFrame {
    pub id: String,
    pub photo_id: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub ordering_key: f64,
}
