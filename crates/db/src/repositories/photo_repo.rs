//! Repository for the `photos` table.

use sqlx::PgPool;
use tracing::debug;

use crate::models::photo::{GpsUpdate, Photo};
use crate::models::NewOrientedImage;
use crate::write_chunks;

/// Column list for the `photos` table.
const COLUMNS: &str = "id, stored_in_blob, upload_failed, aligned, confirmed_by_submitter, \
     blacklisted, lat, lon, capture_timestamp, camera_clock_timestamp, timestamp_repaired, \
     submission_batch_id, bucket_class_id, uploaded_at";

/// Provides data access for photo submissions.
pub struct PhotoRepo;

impl PhotoRepo {
    /// Fetch a photo by its content-hash ID.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Photo>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM photos WHERE id = $1");
        sqlx::query_as::<_, Photo>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the IDs of photos awaiting alignment: stored in blob
    /// storage, not blacklisted, and not yet aligned. When
    /// `require_confirmation` is set, unconfirmed submissions are held
    /// back as well.
    pub async fn list_unaligned_ids(
        pool: &PgPool,
        require_confirmation: bool,
    ) -> Result<Vec<String>, sqlx::Error> {
        let mut sql = String::from(
            "SELECT id FROM photos \
             WHERE stored_in_blob AND NOT aligned AND NOT blacklisted",
        );
        if require_confirmation {
            sql.push_str(" AND confirmed_by_submitter");
        }
        sql.push_str(" ORDER BY uploaded_at");
        sqlx::query_scalar::<_, String>(&sql).fetch_all(pool).await
    }

    /// List all photos belonging to one submission batch, in upload
    /// order.
    pub async fn list_by_batch(
        pool: &PgPool,
        submission_batch_id: &str,
    ) -> Result<Vec<Photo>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM photos \
             WHERE submission_batch_id = $1 \
             ORDER BY uploaded_at"
        );
        sqlx::query_as::<_, Photo>(&query)
            .bind(submission_batch_id)
            .fetch_all(pool)
            .await
    }

    /// List the distinct submission batch IDs that still contain a
    /// photo with missing GPS or capture time.
    pub async fn list_batches_needing_repair(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT submission_batch_id FROM photos \
             WHERE submission_batch_id <> '' \
               AND (lat IS NULL OR lon IS NULL OR capture_timestamp IS NULL) \
             ORDER BY submission_batch_id",
        )
        .fetch_all(pool)
        .await
    }

    /// Mark a set of photos as stored in blob storage. Rows that do
    /// not exist yet are created, so a photo uploaded before its
    /// metadata arrives is never lost. Writes go out in chunks, each
    /// in its own transaction.
    pub async fn mark_stored(pool: &PgPool, ids: &[String]) -> Result<(), sqlx::Error> {
        Self::record_upload_status(pool, ids, false).await
    }

    /// Mark a set of photos as having failed upload so an operator can
    /// find them. Same chunked upsert shape as [`Self::mark_stored`].
    pub async fn mark_upload_failed(pool: &PgPool, ids: &[String]) -> Result<(), sqlx::Error> {
        Self::record_upload_status(pool, ids, true).await
    }

    async fn record_upload_status(
        pool: &PgPool,
        ids: &[String],
        failed: bool,
    ) -> Result<(), sqlx::Error> {
        let (column, query) = if failed {
            (
                "upload_failed",
                "INSERT INTO photos (id, upload_failed) \
                 SELECT unnest($1::text[]), TRUE \
                 ON CONFLICT (id) DO UPDATE SET upload_failed = TRUE",
            )
        } else {
            (
                "stored_in_blob",
                "INSERT INTO photos (id, stored_in_blob) \
                 SELECT unnest($1::text[]), TRUE \
                 ON CONFLICT (id) DO UPDATE SET stored_in_blob = TRUE, upload_failed = FALSE",
            )
        };

        for chunk in write_chunks(ids) {
            let mut tx = pool.begin().await?;
            sqlx::query(query).bind(chunk).execute(&mut *tx).await?;
            tx.commit().await?;
            debug!(count = chunk.len(), column, "recorded upload status");
        }
        Ok(())
    }

    /// Mark a photo aligned and record its oriented image in one
    /// transaction. Re-running for an already aligned photo is a
    /// no-op on the oriented image.
    pub async fn mark_aligned(
        pool: &PgPool,
        oriented: &NewOrientedImage,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE photos SET aligned = TRUE WHERE id = $1")
            .bind(&oriented.photo_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO oriented_images (id, photo_id, frame_class_id, ordering_key) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&oriented.id)
        .bind(&oriented.photo_id)
        .bind(oriented.frame_class_id)
        .bind(oriented.ordering_key)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    /// Mark a photo as permanently unusable for the pipelines.
    pub async fn blacklist(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE photos SET blacklisted = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Apply GPS/time repair results for a batch. One transaction per
    /// chunk keeps each batch write bounded.
    pub async fn update_gps(pool: &PgPool, updates: &[GpsUpdate]) -> Result<(), sqlx::Error> {
        for chunk in write_chunks(updates) {
            let mut tx = pool.begin().await?;
            for update in chunk {
                sqlx::query(
                    "UPDATE photos \
                     SET lat = $2, lon = $3, capture_timestamp = $4, timestamp_repaired = $5 \
                     WHERE id = $1",
                )
                .bind(&update.id)
                .bind(update.lat)
                .bind(update.lon)
                .bind(update.capture_timestamp)
                .bind(update.timestamp_repaired)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            debug!(count = chunk.len(), "applied gps/time repairs");
        }
        Ok(())
    }
}
