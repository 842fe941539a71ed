//! Repository for the `movies` table.

use sqlx::PgPool;

use crate::models::movie::Movie;

/// Column list for the `movies` table.
const COLUMNS: &str = "name, contributing_photos, created_at";

/// Provides data access for assembled movie artifacts.
pub struct MovieRepo;

impl MovieRepo {
    /// Record a newly assembled movie and the photos it was built
    /// from.
    pub async fn insert(
        pool: &PgPool,
        name: &str,
        contributing_photos: &[String],
    ) -> Result<Movie, sqlx::Error> {
        let query = format!(
            "INSERT INTO movies (name, contributing_photos) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Movie>(&query)
            .bind(name)
            .bind(contributing_photos)
            .fetch_one(pool)
            .await
    }

    /// Fetch the most recently assembled movie, if any.
    pub async fn latest(pool: &PgPool) -> Result<Option<Movie>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM movies \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Movie>(&query).fetch_optional(pool).await
    }
}
