use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use super::schema::ValidationError;

/// Failure taxonomy for the upload-and-analyze pipeline. Every stage failure
/// aborts the request; nothing partial is stored and nothing is retried.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Missing or malformed request input (400).
    #[error("{0}")]
    Input(String),

    /// Image bytes could not be obtained from storage or over HTTP.
    #[error("failed to obtain image bytes: {0}")]
    Fetch(String),

    /// The external analysis call failed or returned an unusable status.
    /// Async misconfiguration gets its own message since it needs operator
    /// action rather than a client retry.
    #[error("analysis webhook failed: {0}")]
    Webhook(String),

    /// The webhook responded, but with a shape none of the known wrapping
    /// conventions match.
    #[error("unrecognized webhook response shape; expected structured nutrition data")]
    Extraction,

    /// The extracted payload does not match the nutrition schema.
    #[error("invalid nutrition payload: {0}")]
    Validation(#[from] ValidationError),
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        match self {
            AnalysisError::Input(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to analyze meal",
                    "details": other.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_input_maps_to_400() {
        let resp = AnalysisError::Input("Image URL is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_downstream_failures_map_to_500() {
        for err in [
            AnalysisError::Fetch("connection refused".into()),
            AnalysisError::Webhook("status 503".into()),
            AnalysisError::Extraction,
            AnalysisError::Validation(ValidationError {
                path: "total".into(),
                message: "missing field".into(),
            }),
        ] {
            assert_eq!(
                err.into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }
}
