//! Ingress: the axum router exposing the gateway's wire surface.

mod extract;
mod handlers;

use crate::app::Services;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the full router: dialect endpoints, model listings, and the
/// liveness/readiness probes used by orchestrators.
#[must_use]
pub fn build_router(services: Arc<Services>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/messages", post(handlers::messages))
        .route(
            "/v1beta/models/{model}:generateContent",
            post(handlers::gemini_generate_content),
        )
        .route(
            "/v1beta/models/{model}:streamGenerateContent",
            post(handlers::gemini_stream_generate_content),
        )
        .route("/v1/models", get(handlers::list_models))
        .route("/v1beta/models", get(handlers::list_models_gemini))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .with_state(services)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_methods(Any).allow_headers(Any).allow_origin(Any)),
        )
}
