use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, error, info};

use super::error::AnalysisError;
use super::normalize::normalize;
use super::schema::{validate, NutritionPayload};
use crate::state::AppState;

/// Multipart field carrying the image bytes, fixed by the workflow contract.
const IMAGE_FIELD: &str = "image";
const IMAGE_FILENAME: &str = "meal_image.jpg";
// The workflow treats everything as jpeg regardless of the source format;
// an accepted simplification.
const IMAGE_MIME: &str = "image/jpeg";

/// Runs the full analyze pipeline for one image: resolve bytes, forward to
/// the workflow webhook, normalize and validate the response. One request
/// in, one external call out; no retries, no queuing.
pub async fn analyze(state: &AppState, image_url: &str) -> Result<NutritionPayload, AnalysisError> {
    let image = resolve_image_bytes(state, image_url).await?;
    debug!(%image_url, size = image.len(), "resolved image bytes");

    let raw = call_webhook(state, image).await?;

    let payload = normalize(&raw).ok_or_else(|| {
        error!(%image_url, body = %raw, "unrecognized webhook response shape");
        AnalysisError::Extraction
    })?;

    let nutrition = validate(&payload).map_err(|e| {
        error!(%image_url, error = %e, "webhook payload failed validation");
        e
    })?;

    info!(%image_url, items = nutrition.food.len(), "analysis complete");
    Ok(nutrition)
}

/// Locators under our own `/uploads/` path are read straight from storage;
/// anything else is fetched over HTTP.
async fn resolve_image_bytes(state: &AppState, image_url: &str) -> Result<Bytes, AnalysisError> {
    if let Some(key) = image_url.split("/uploads/").nth(1) {
        // The locator is client-supplied; a traversal key must not reach the
        // filesystem-backed storage impl.
        if !crate::storage::is_safe_object_key(key) {
            return Err(AnalysisError::Fetch(format!("invalid storage key: {}", key)));
        }
        return match state.storage.get_object(key).await {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(AnalysisError::Fetch(format!(
                "image not found in storage: {}",
                key
            ))),
            Err(e) => {
                error!(%key, error = %e, "storage read failed");
                Err(AnalysisError::Fetch(e.to_string()))
            }
        };
    }

    debug!(%image_url, "fetching external image");
    let resp = state
        .http
        .get(image_url)
        .send()
        .await
        .map_err(|e| AnalysisError::Fetch(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(AnalysisError::Fetch(format!(
            "fetching {} returned status {}",
            image_url,
            resp.status()
        )));
    }
    resp.bytes()
        .await
        .map_err(|e| AnalysisError::Fetch(e.to_string()))
}

async fn call_webhook(state: &AppState, image: Bytes) -> Result<Value, AnalysisError> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    let part = Part::bytes(image.to_vec())
        .file_name(IMAGE_FILENAME)
        .mime_str(IMAGE_MIME)
        .map_err(|e| AnalysisError::Webhook(e.to_string()))?;
    let form = Form::new()
        .part(IMAGE_FIELD, part)
        .text("timestamp", timestamp)
        .text("mimeType", IMAGE_MIME);

    debug!(url = %state.config.webhook_url, "posting image to analysis webhook");
    let resp = state
        .http
        .post(&state.config.webhook_url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                AnalysisError::Webhook(format!(
                    "no response within {}s",
                    state.config.webhook_timeout_secs
                ))
            } else {
                AnalysisError::Webhook(e.to_string())
            }
        })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        error!(%status, %body, "webhook returned error status");
        if body.contains("test mode") || body.contains("Execute workflow") {
            return Err(AnalysisError::Webhook(
                "webhook is in test mode; execute the workflow in the automation tool and retry"
                    .into(),
            ));
        }
        return Err(AnalysisError::Webhook(format!(
            "status {}: {}",
            status, body
        )));
    }

    let raw: Value = resp
        .json()
        .await
        .map_err(|e| AnalysisError::Webhook(format!("non-JSON response: {}", e)))?;

    // A "started" acknowledgement means the webhook is configured for async
    // execution and will never hand us a result on this call. That needs an
    // operator, not a retry.
    if raw.get("message").and_then(Value::as_str) == Some("Workflow was started") {
        error!("webhook acknowledged asynchronously instead of returning a result");
        return Err(AnalysisError::Webhook(
            "webhook runs asynchronously; reconfigure it to respond when the workflow finishes"
                .into(),
        ));
    }

    Ok(raw)
}
