use anyhow::Context;
use bytes::Bytes;
use rand::Rng;
use time::OffsetDateTime;

use crate::state::AppState;

/// Generates a storage key with a timestamp-random suffix. Concurrent
/// uploads get distinct keys, so writes never collide.
pub fn generate_key(extension: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("image-{}-{}.{}", millis, suffix, extension)
}

/// Persists image bytes under `key` and returns the retrievable URL.
/// Payloads over the configured cap are rejected before anything is written.
pub async fn store_bytes(
    st: &AppState,
    key: &str,
    body: Bytes,
    content_type: &str,
) -> anyhow::Result<String> {
    anyhow::ensure!(
        body.len() <= st.config.max_upload_bytes,
        "upload of {} bytes exceeds the {} byte limit",
        body.len(),
        st.config.max_upload_bytes
    );
    st.storage
        .put_object(key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    st.storage.public_url(key).await
}

pub async fn retrieve_bytes(st: &AppState, key: &str) -> anyhow::Result<Option<Bytes>> {
    st.storage.get_object(key).await
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

pub fn mime_from_key(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}
