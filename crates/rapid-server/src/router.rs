use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use rapid_engine::DocumentStore;

use crate::handler::{self, AppState};

const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Build the axum router with all Rapid endpoints.
pub fn build_router(store: Arc<DocumentStore>) -> Router {
    Router::new()
        .route("/_health", get(handler::health_handler))
        .route("/_info", get(handler::info_handler))
        .fallback(handler::document_handler)
        .with_state(AppState::new(store))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
}

/// Any origin, any header, with credentials. Credentialed CORS forbids
/// wildcards, so origin and headers are echoed back from the request.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}
