//! Document-store layer: models and repositories over Postgres.

pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// The store commits at most this many records per batch write; every
/// multi-hundred-record write must chunk accordingly.
pub const MAX_BATCH_WRITE: usize = 500;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Split `items` into store-sized write batches. An empty slice yields
/// no batches (and therefore no commits).
pub fn write_chunks<T>(items: &[T]) -> std::slice::Chunks<'_, T> {
    items.chunks(MAX_BATCH_WRITE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_sizes(n: usize) -> Vec<usize> {
        let items: Vec<u32> = (0..n as u32).collect();
        write_chunks(&items).map(<[u32]>::len).collect()
    }

    #[test]
    fn no_commits_for_empty_input() {
        assert!(chunk_sizes(0).is_empty());
    }

    #[test]
    fn chunking_respects_the_store_limit() {
        assert_eq!(chunk_sizes(1), vec![1]);
        assert_eq!(chunk_sizes(500), vec![500]);
        assert_eq!(chunk_sizes(501), vec![500, 1]);
        assert_eq!(chunk_sizes(1999), vec![500, 500, 500, 499]);
    }

    #[test]
    fn every_chunk_is_within_the_limit() {
        for n in [0usize, 1, 499, 500, 501, 1999, 5000] {
            assert!(chunk_sizes(n).iter().all(|&s| s <= MAX_BATCH_WRITE));
            assert_eq!(chunk_sizes(n).iter().sum::<usize>(), n);
        }
    }
}
