//! Photo entity model.

use serde::Serialize;
use sqlx::FromRow;

use megamovie_core::types::Timestamp;

use super::class::ClassId;

/// A row from the `photos` table. The identity is the hex SHA-256
/// content hash of the original upload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Photo {
    pub id: String,
    pub stored_in_blob: bool,
    pub upload_failed: bool,
    pub aligned: bool,
    pub confirmed_by_submitter: bool,
    pub blacklisted: bool,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub capture_timestamp: Option<Timestamp>,
    pub camera_clock_timestamp: Option<Timestamp>,
    pub timestamp_repaired: bool,
    pub submission_batch_id: String,
    pub bucket_class_id: ClassId,
    pub uploaded_at: Timestamp,
}

/// The slice of a photo the GPS/time repair writes back. Derived from
/// a read copy, never aliased into one.
#[derive(Debug, Clone)]
pub struct GpsUpdate {
    pub id: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub capture_timestamp: Option<Timestamp>,
    pub timestamp_repaired: bool,
}
