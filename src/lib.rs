use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod media;
pub mod models;
pub mod policy;
pub mod repository;

// Routing segregation (public API + service endpoints, authenticated uploads).
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::{AppConfig, SessionFailurePolicy};
pub use error::AppError;
pub use media::{CloudinaryClient, MediaHostState, MockMediaHost};
pub use policy::{AccessDecision, AccessPolicy, Session};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the HTTP surface, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::upload_image, handlers::upload_video, handlers::get_videos),
    components(
        schemas(
            models::Video, models::ImageUploadResponse, models::VideoUploadResponse,
            models::ErrorResponse, models::ImageUploadForm, models::VideoUploadForm,
        )
    ),
    tags(
        (name = "mediaflex", description = "MediaFlex media upload API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container of application services shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Record store for video metadata.
    pub repo: RepositoryState,
    /// Media host client. `None` when no credentials were configured; uploads then
    /// answer 500 before touching the request body.
    pub media: Option<MediaHostState>,
    /// Loaded environment configuration.
    pub config: AppConfig,
    /// Access-control policy consulted by `access_middleware`.
    pub policy: Arc<AccessPolicy>,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<AccessPolicy> {
    fn from_ref(app_state: &AppState) -> Arc<AccessPolicy> {
        app_state.policy.clone()
    }
}

/// access_middleware
///
/// Gate in front of every application route.
///
/// 1. Static assets and framework internals bypass the policy.
/// 2. The session is resolved from the request headers. A token that fails verification
///    is handled per `SessionFailurePolicy`: fail-closed treats the caller as anonymous,
///    fail-open forwards the request without a session.
/// 3. `AccessPolicy::decide` picks the outcome. Allowed requests carry the resolved
///    `Session` in their extensions for the `AuthUser` extractor; redirects are 307s.
async fn access_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let policy = &state.policy;
    let path = request.uri().path().to_string();

    if !policy.should_evaluate(&path) {
        return next.run(request).await;
    }

    let session = match auth::resolve_session(request.headers(), &state.config) {
        Ok(session) => session,
        Err(e) => match state.config.session_failure_policy {
            SessionFailurePolicy::FailClosed => {
                tracing::debug!(error = %e, "session resolution failed, treating caller as anonymous");
                Session::Anonymous
            }
            SessionFailurePolicy::FailOpen => {
                tracing::warn!(error = %e, path = %path, "session resolution failed, allowing request");
                return next.run(request).await;
            }
        },
    };

    let decision = policy.decide(&path, policy.is_api_request(&path), &session);
    tracing::debug!(path = %path, ?decision, authenticated = session.is_authenticated(), "access decision");

    match decision {
        AccessDecision::Allow => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        AccessDecision::RedirectToSignIn => {
            Redirect::temporary(policy.sign_in_path()).into_response()
        }
        AccessDecision::RedirectToHome => Redirect::temporary(policy.home_path()).into_response(),
    }
}

/// create_router
///
/// Assembles the routing structure, applies the access middleware and the observability
/// layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(public::public_api_routes())
        .merge(authenticated::authenticated_routes(state.config.max_upload_bytes));

    // Everything merged before the middleware layer is gated, the fallback included, so
    // unknown page paths still redirect anonymous callers.
    let application = Router::new()
        .nest(state.policy.api_prefix(), api_routes)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access_middleware,
        ));

    // Health and documentation stay reachable without a session.
    let docs = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    // Outermost: assign an `x-request-id`, open one span per request tagged with it, and
    // echo the id back on the response.
    let observability = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(tower_http::LatencyUnit::Millis),
                ),
        )
        .layer(PropagateRequestIdLayer::new(request_id_header));

    application
        .merge(public::service_routes())
        .merge(docs)
        .with_state(state)
        .layer(observability)
        .layer(CorsLayer::permissive())
}

const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_span(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}
