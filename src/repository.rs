use crate::models::{NewVideo, Video};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// StoreError
///
/// Connectivity or constraint failure reported by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Abstract contract for the video record store. Handlers depend on this trait only,
/// so tests substitute in-memory implementations for `PostgresRepository`.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum's
/// task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // Inserts a record and returns it with its assigned id and timestamps.
    async fn create_video(&self, video: NewVideo) -> Result<Video, StoreError>;
    // All records, newest first.
    async fn list_videos(&self) -> Result<Vec<Video>, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const VIDEO_COLUMNS: &str = "id, title, description, public_id, original_size, compressed_size, duration, created_at, updated_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// create_video
    ///
    /// Single INSERT ... RETURNING round trip; the id is generated here, timestamps by
    /// the database.
    async fn create_video(&self, video: NewVideo) -> Result<Video, StoreError> {
        let query = format!(
            r#"
            INSERT INTO videos (id, title, description, public_id, original_size, compressed_size, duration, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {VIDEO_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Video>(&query)
            .bind(Uuid::new_v4())
            .bind(video.title)
            .bind(video.description)
            .bind(video.public_id)
            .bind(video.original_size)
            .bind(video.compressed_size)
            .bind(video.duration)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    /// list_videos
    ///
    /// Newest first, matching the listing endpoint's contract.
    async fn list_videos(&self) -> Result<Vec<Video>, StoreError> {
        let query = format!("SELECT {VIDEO_COLUMNS} FROM videos ORDER BY created_at DESC");

        let videos = sqlx::query_as::<_, Video>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(videos)
    }
}
