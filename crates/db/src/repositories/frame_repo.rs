//! Repository for the `oriented_images` table.

use sqlx::PgPool;

use crate::models::oriented_image::{AssemblyFrame, OrientedImage};
use crate::models::{ClassId, FrameClass};

/// Column list for the `oriented_images` table.
const COLUMNS: &str = "id, photo_id, frame_class_id, ordering_key, created_at";

/// Provides data access for aligned frames.
pub struct FrameRepo;

impl FrameRepo {
    /// Fetch a single oriented image by ID.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<OrientedImage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM oriented_images WHERE id = $1");
        sqlx::query_as::<_, OrientedImage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the frames eligible for movie assembly, joined with the
    /// source photo's coordinates and sorted west-to-east along the
    /// path of totality. Blacklisted photos are excluded even after
    /// alignment.
    pub async fn list_totality_ordered(pool: &PgPool) -> Result<Vec<AssemblyFrame>, sqlx::Error> {
        sqlx::query_as::<_, AssemblyFrame>(
            "SELECT oi.id, oi.photo_id, p.lat, p.lon, oi.ordering_key \
             FROM oriented_images oi \
             JOIN photos p ON p.id = oi.photo_id \
             WHERE oi.frame_class_id = $1 AND NOT p.blacklisted \
             ORDER BY oi.ordering_key, oi.id",
        )
        .bind(FrameClass::TotalityFullDisk.id())
        .fetch_all(pool)
        .await
    }

    /// Reclassify a frame, e.g. after manual review finds a partial
    /// disk that slipped through detection.
    pub async fn set_frame_class(
        pool: &PgPool,
        id: &str,
        frame_class_id: ClassId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE oriented_images SET frame_class_id = $2 WHERE id = $1")
            .bind(id)
            .bind(frame_class_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
