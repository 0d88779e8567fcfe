use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::core::config::AppConfig;
use crate::storage::disk::DiskVideoSlot;

use super::handlers;
use super::middleware::request_context;

/// Room for multipart boundaries and part headers on top of the file ceiling.
/// The file size itself is enforced exactly while streaming the field.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

// ---------------------------------------------------------------------------
// HTTP router
// ---------------------------------------------------------------------------

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub slot: Arc<DiskVideoSlot>,
    pub config: AppConfig,
    /// Present when metrics are enabled.
    pub metrics_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

/// Build the Axum router with all routes.
///
/// - `POST /upload`             - store a video in the latest slot
/// - `GET  /api/video/latest`   - stream the latest video
/// - `GET  /health`             - liveness probe
/// - `GET  /metrics`            - Prometheus metrics (when enabled)
/// - `GET  /uploads/*`          - raw files from the upload directory
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;
    tracing::info!(
        upload_dir = %state.slot.dir().display(),
        max_upload_size_bytes = config.ingest.max_upload_size_bytes,
        cors_origins = ?config.delivery.cors_allowed_origins,
        "router configuration loaded"
    );

    let body_limit = usize::try_from(
        config
            .ingest
            .max_upload_size_bytes
            .saturating_add(MULTIPART_OVERHEAD_BYTES),
    )
    .unwrap_or(usize::MAX);

    let static_files = ServeDir::new(state.slot.dir());
    let cors = cors_layer(&config.delivery.cors_allowed_origins);

    let mut router = Router::new()
        .route(
            "/upload",
            post(handlers::upload_video).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/video/latest", get(handlers::latest_video))
        .route("/health", get(handlers::health));

    if state.metrics_handle.is_some() {
        router = router.route("/metrics", get(handlers::metrics_handler));
    }

    router
        .nest_service("/uploads", static_files)
        .layer(cors)
        .layer(axum::middleware::from_fn(request_context))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            http::Method::GET,
            http::Method::HEAD,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(Any)
        .expose_headers([http::header::CONTENT_LENGTH])
}
