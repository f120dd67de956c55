//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::admin::{annotate_video, delete_video, register_video, update_video};
use crate::handlers::auth::{login, verify};
use crate::handlers::providers::{generate_summary, thumbnail, youtube_info};
use crate::handlers::videos::{api_not_found, get_video, list_keywords, list_themes, list_videos};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Login attempts per second per IP.
const LOGIN_RATE_LIMIT_RPS: u32 = 2;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let public_routes = Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/:id", get(get_video))
        .route("/themes", get(list_themes))
        .route("/keywords", get(list_keywords))
        .route("/youtube-info/:video_id", get(youtube_info))
        .route("/thumbnail", get(thumbnail))
        .route("/generate-summary", post(generate_summary));

    let admin_routes = Router::new()
        .route("/admin/videos", post(register_video))
        .route("/admin/videos/:id", put(update_video).delete(delete_video))
        .route("/admin/videos/:id/annotation", put(annotate_video))
        .route("/auth/verify", get(verify));

    // Login gets its own, tighter limiter against password guessing
    let login_routes = Router::new()
        .route("/auth/login", post(login))
        .layer(middleware::from_fn_with_state(
            Arc::new(RateLimiterCache::new(LOGIN_RATE_LIMIT_RPS)),
            rate_limit_middleware,
        ));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware))
        .merge(login_routes)
        .fallback(api_not_found);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let static_files = ServeDir::new(&state.config.static_dir).append_index_html_on_directories(true);

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .fallback_service(static_files)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
