use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10 MiB

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Endpoint of the external analysis workflow.
    pub webhook_url: String,
    pub webhook_timeout_secs: u64,
    pub storage_mode: StorageMode,
    pub upload_dir: PathBuf,
    /// Base URL under which stored images are reachable from outside.
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub s3: Option<S3Config>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let webhook_url =
            std::env::var("WEBHOOK_URL").map_err(|_| anyhow::anyhow!("WEBHOOK_URL is not set"))?;

        let storage_mode = match std::env::var("STORAGE_MODE").as_deref() {
            Ok("s3") => StorageMode::S3,
            _ => StorageMode::Local,
        };

        let s3 = match storage_mode {
            StorageMode::S3 => Some(S3Config {
                endpoint: require_env("S3_ENDPOINT")?,
                bucket: require_env("S3_BUCKET")?,
                access_key: require_env("S3_ACCESS_KEY")?,
                secret_key: require_env("S3_SECRET_KEY")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            }),
            StorageMode::Local => None,
        };

        Ok(Self {
            webhook_url,
            webhook_timeout_secs: std::env::var("WEBHOOK_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
            storage_mode,
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".into())
                .into(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            s3,
        })
    }
}

fn require_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{} is not set", name))
}
