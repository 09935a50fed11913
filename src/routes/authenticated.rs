use crate::{AppState, handlers};
use axum::{Router, extract::DefaultBodyLimit, routing::post};

/// Authenticated Router Module
///
/// Upload endpoints. Anonymous callers are redirected by the access middleware, and the
/// handlers' `AuthUser` extractor rejects with 401 anything that still arrives without an
/// identity (fail-open deployments, routers built without the middleware).
///
/// Multipart bodies may be up to `max_upload_bytes`, well above axum's default limit.
pub fn authenticated_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/upload/image
        // Multipart field `file`. Answers `{ "public_id": ... }`.
        .route("/upload/image", post(handlers::upload_image))
        // POST /api/upload/video
        // Multipart fields `file`, `title`, `description`, `originalSize`.
        // Answers `{ "video": <record> }`.
        .route("/upload/video", post(handlers::upload_video))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
