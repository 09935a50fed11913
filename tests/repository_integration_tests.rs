use mediaflex::{
    models::NewVideo,
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the pool for a live PostgreSQL instance. These tests are ignored by default;
/// run them with `DATABASE_URL` set and `--ignored`.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }

    async fn cleanup(&self, public_ids: &[String]) {
        sqlx::query("DELETE FROM videos WHERE public_id = ANY($1)")
            .bind(public_ids)
            .execute(&self.pool)
            .await
            .expect("Failed to clean up test videos");
    }
}

fn new_video(title: &str) -> NewVideo {
    NewVideo {
        title: title.to_string(),
        description: None,
        public_id: format!("MediaFlex-videos/test-{}", Uuid::new_v4()),
        original_size: "2048".to_string(),
        compressed_size: "1024".to_string(),
        duration: 3.5,
    }
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_create_video_assigns_id_and_timestamps() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let input = NewVideo {
        description: Some("From the beach".to_string()),
        ..new_video("Holiday")
    };
    let created = repo.create_video(input.clone()).await.unwrap();

    assert_eq!(created.title, "Holiday");
    assert_eq!(created.description.as_deref(), Some("From the beach"));
    assert_eq!(created.public_id, input.public_id);
    assert_eq!(created.original_size, "2048");
    assert_eq!(created.compressed_size, "1024");
    assert_eq!(created.duration, 3.5);
    assert!(!created.id.is_nil());
    assert_eq!(created.created_at, created.updated_at);

    ctx.cleanup(&[created.public_id]).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_list_videos_newest_first() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let first = repo.create_video(new_video("First")).await.unwrap();
    // NOW() is per transaction; separate statements get distinct timestamps.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let second = repo.create_video(new_video("Second")).await.unwrap();

    let listed = repo.list_videos().await.unwrap();
    let position = |id| listed.iter().position(|v| v.id == id).unwrap();

    assert!(position(second.id) < position(first.id));
    for pair in listed.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }

    ctx.cleanup(&[first.public_id, second.public_id]).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_closed_pool_is_a_store_error() {
    let ctx = DbTestContext::setup().await;
    ctx.pool.close().await;

    let result = ctx.repository().list_videos().await;

    assert!(result.is_err());
}
