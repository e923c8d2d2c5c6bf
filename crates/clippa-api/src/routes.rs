//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::clips::{cleanup_clip, create_clip, get_clip, get_clip_url};
use crate::handlers::media::{get_formats, get_info};
use crate::handlers::{alive, ping};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_logging, require_bearer};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let protected = Router::new()
        .route("/clip", post(create_clip))
        .route("/clip/:id", get(get_clip))
        .route("/clip/:id/url", get(get_clip_url))
        .route("/clip/:id/cleanup", delete(cleanup_clip))
        .route("/formats", get(get_formats))
        .route("/info", get(get_info))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    let api_routes = Router::new().route("/ping", get(ping)).merge(protected);

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .route("/", get(alive))
        .nest("/api", api_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
