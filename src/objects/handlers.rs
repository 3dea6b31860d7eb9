use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};

use super::dto::{UploadTargetResponse, UploadedImageResponse};
use super::services;
use crate::state::AppState;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/objects/upload", post(request_upload_target))
        .route("/api/upload-image", put(upload_raw).post(upload_multipart))
        .route("/uploads/:key", get(serve_object).delete(delete_object))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Issues a destination the client can PUT raw bytes at. Local mode points
/// back at our own upload endpoint; S3 mode hands out a presigned URL.
#[instrument(skip(state))]
pub async fn request_upload_target(
    State(state): State<AppState>,
) -> Result<Json<UploadTargetResponse>, (StatusCode, String)> {
    let key = services::generate_key("jpg");
    let upload_url = state.storage.upload_url(&key).await.map_err(|e| {
        error!(error = %e, "failed to generate upload URL");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate upload URL".into(),
        )
    })?;
    Ok(Json(UploadTargetResponse { upload_url }))
}

/// PUT with the raw image body. Raw uploads carry no filename, so the key
/// defaults to a jpg extension. Responds with the public image URL as plain
/// text.
#[instrument(skip(state, body))]
pub async fn upload_raw(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<String, (StatusCode, String)> {
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Empty upload body".into()));
    }
    if body.len() > state.config.max_upload_bytes {
        warn!(size = body.len(), "raw upload over size limit");
        return Err((StatusCode::PAYLOAD_TOO_LARGE, "Image too large".into()));
    }

    let key = services::generate_key("jpg");
    let url = services::store_bytes(&state, &key, body, "image/jpeg")
        .await
        .map_err(|e| {
            error!(error = %e, %key, "raw upload failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save file".into())
        })?;

    info!(%key, %url, "raw image stored");
    Ok(url)
}

/// POST multipart with an `image` field. Non-image content types are
/// rejected.
#[instrument(skip(state, mp))]
pub async fn upload_multipart(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<UploadedImageResponse>, (StatusCode, String)> {
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        if !content_type.starts_with("image/") {
            return Err((
                StatusCode::BAD_REQUEST,
                "Only image files are allowed".into(),
            ));
        }

        let body = field.bytes().await.map_err(|e| {
            warn!(error = %e, "failed to read multipart field");
            (StatusCode::BAD_REQUEST, "Malformed multipart body".into())
        })?;
        if body.len() > state.config.max_upload_bytes {
            return Err((StatusCode::PAYLOAD_TOO_LARGE, "Image too large".into()));
        }

        let ext = services::ext_from_mime(&content_type).unwrap_or("jpg");
        let key = services::generate_key(ext);
        let url = services::store_bytes(&state, &key, body, &content_type)
            .await
            .map_err(|e| {
                error!(error = %e, %key, "multipart upload failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save file".into())
            })?;

        info!(%key, %url, "multipart image stored");
        return Ok(Json(UploadedImageResponse {
            success: true,
            image_url: url,
            filename: key,
        }));
    }

    Err((StatusCode::BAD_REQUEST, "No image file provided".into()))
}

#[instrument(skip(state))]
pub async fn serve_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    // Axum percent-decodes the segment, so `..%2F` arrives as `../`.
    if !crate::storage::is_safe_object_key(&key) {
        warn!(%key, "rejected unsafe object key");
        return (StatusCode::NOT_FOUND, "Object not found").into_response();
    }
    match services::retrieve_bytes(&state, &key).await {
        Ok(Some(bytes)) => (
            [(header::CONTENT_TYPE, services::mime_from_key(&key))],
            bytes,
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Object not found").into_response(),
        Err(e) => {
            error!(error = %e, %key, "object read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read object").into_response()
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    if !crate::storage::is_safe_object_key(&key) {
        warn!(%key, "rejected unsafe object key");
        return (StatusCode::NOT_FOUND, "Object not found").into_response();
    }
    match state.storage.delete_object(&key).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Object not found").into_response(),
        Err(e) => {
            error!(error = %e, %key, "object delete failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete object").into_response()
        }
    }
}
