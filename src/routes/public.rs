use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public API Router
///
/// Endpoints anonymous callers may reach. Every path here must also be listed in the
/// access policy's public API routes, otherwise the middleware redirects anonymous
/// callers before the handler runs.
pub fn public_api_routes() -> Router<AppState> {
    Router::new()
        // GET /api/videos
        // Every recorded video, newest first.
        .route("/videos", get(handlers::get_videos))
}

/// Service Router
///
/// Infrastructure endpoints merged outside the access middleware.
pub fn service_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer and uptime checks.
        .route("/health", get(|| async { "ok" }))
}
