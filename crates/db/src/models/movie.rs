//! Movie artifact entity model.

use serde::Serialize;
use sqlx::FromRow;

use megamovie_core::types::Timestamp;

/// A row from the `movies` table. Created once per successful assembly
/// pass and never mutated; `contributing_photos` exists for
/// attribution of the source submissions.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Movie {
    pub name: String,
    pub contributing_photos: Vec<String>,
    pub created_at: Timestamp,
}
