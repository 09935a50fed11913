use mediaflex::{
    AccessPolicy, AppState,
    config::{AppConfig, Env},
    create_router,
    media::{CloudinaryClient, MediaHostState},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "mediaflex=debug,tower_http=info,axum=trace";
const STORE_MAX_CONNECTIONS: u32 = 5;

/// main
///
/// Startup order: configuration, logging, record store, media host client, HTTP server.
/// Any failure before the listener is bound aborts the process.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    init_tracing(&config.env);
    tracing::info!(env = ?config.env, "mediaflex starting");

    let repo = connect_store(&config.db_url).await;
    let media = media_host(&config);

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        media,
        config,
        policy: Arc::new(AccessPolicy::default()),
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!(%bind_addr, "listening; OpenAPI docs at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}

/// RUST_LOG wins over the default filter. Pretty output locally, JSON in production.
fn init_tracing(env: &Env) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match env {
        Env::Local => registry.with(fmt::layer().pretty()).init(),
        Env::Production => registry.with(fmt::layer().json()).init(),
    }
}

async fn connect_store(db_url: &str) -> RepositoryState {
    let pool = PgPoolOptions::new()
        .max_connections(STORE_MAX_CONNECTIONS)
        .connect(db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    Arc::new(PostgresRepository::new(pool))
}

// Without credentials the server still starts; uploads answer 500.
fn media_host(config: &AppConfig) -> Option<MediaHostState> {
    match &config.media {
        Some(media_config) => {
            tracing::info!(cloud_name = %media_config.cloud_name, "media host configured");
            Some(Arc::new(CloudinaryClient::new(media_config.clone())))
        }
        None => {
            tracing::warn!("CLOUDINARY_* credentials are not set; uploads are disabled");
            None
        }
    }
}
