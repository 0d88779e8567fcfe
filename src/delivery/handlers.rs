use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::core::error::{DeliveryError, UploadError};
use crate::core::types::{content_type_for_path, UploadResponse};
use crate::ingest::http_upload::HttpUploadHandler;
use crate::observability::metrics as obs;

use super::router::AppState;

// ---------------------------------------------------------------------------
// Upload endpoint
// ---------------------------------------------------------------------------

/// `POST /upload` - store the `video` field in the latest slot.
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, UploadError> {
    let start = std::time::Instant::now();

    let result = match multipart {
        Ok(multipart) => {
            HttpUploadHandler::new(&state.config.ingest, &state.slot)
                .receive(multipart)
                .await
        }
        Err(rejection) => Err(UploadError::Multipart {
            reason: rejection.body_text(),
        }),
    };

    match result {
        Ok(stored) => {
            obs::inc_upload("success");
            obs::record_upload_size(stored.size_bytes as f64);
            obs::record_upload_duration(start.elapsed().as_secs_f64());
            Ok(Json(UploadResponse::from(&stored)))
        }
        Err(e) => {
            obs::inc_upload(e.error_code());
            if let UploadError::Storage(_) = e {
                obs::inc_storage_error("put");
            } else {
                warn!(error = %e, "upload rejected");
            }
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Retrieval endpoint
// ---------------------------------------------------------------------------

/// `GET /api/video/latest` - stream the stored video.
///
/// The body is streamed from the open file with `Content-Length` set, so a
/// read failure mid-body aborts the connection short of the advertised
/// length instead of ending as a clean, truncated 200.
pub async fn latest_video(State(state): State<AppState>) -> Result<Response, DeliveryError> {
    let opened = state.slot.open().await.inspect_err(|_| {
        obs::inc_retrieval("storage_error");
        obs::inc_storage_error("get");
    })?;

    let Some((file, video)) = opened else {
        obs::inc_retrieval("not_found");
        debug!("latest video requested before any upload");
        return Err(DeliveryError::NotFound);
    };

    obs::inc_retrieval("success");
    obs::add_delivery_bytes_sent(video.size_bytes);

    let content_type = content_type_for_path(&video.file_name());
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, video.size_bytes.to_string()),
            (header::CACHE_CONTROL, state.config.delivery.cache_control.clone()),
        ],
        body,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Health + metrics endpoints
// ---------------------------------------------------------------------------

/// `GET /health` - liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /metrics` - Prometheus text exposition.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
