use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::{AppConfig, StorageMode};
use crate::storage::{LocalDiskStorage, S3Storage, StorageClient};
use crate::store::AnalysisStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub store: AnalysisStore,
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let storage: Arc<dyn StorageClient> = match config.storage_mode {
            StorageMode::S3 => {
                let s3 = config
                    .s3
                    .as_ref()
                    .context("storage mode is s3 but no s3 config present")?;
                Arc::new(
                    S3Storage::new(
                        &s3.endpoint,
                        &s3.bucket,
                        &s3.access_key,
                        &s3.secret_key,
                        &s3.region,
                    )
                    .await?,
                )
            }
            StorageMode::Local => Arc::new(LocalDiskStorage::new(
                config.upload_dir.clone(),
                &config.public_base_url,
            )?),
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.webhook_timeout_secs))
            .build()
            .context("build http client")?;

        Ok(Self {
            config,
            storage,
            store: AnalysisStore::new(),
            http,
        })
    }

    pub fn fake() -> Self {
        Self::fake_with_webhook("http://127.0.0.1:9/webhook")
    }

    /// In-memory state for tests: map-backed storage, fresh store, short
    /// outbound timeout.
    pub fn fake_with_webhook(webhook_url: &str) -> Self {
        use async_trait::async_trait;
        use bytes::Bytes;
        use std::collections::HashMap;
        use std::sync::Mutex;

        #[derive(Default)]
        struct MemStorage {
            objects: Mutex<HashMap<String, Bytes>>,
        }

        #[async_trait]
        impl StorageClient for MemStorage {
            async fn put_object(
                &self,
                key: &str,
                body: Bytes,
                _content_type: &str,
            ) -> anyhow::Result<()> {
                self.objects.lock().unwrap().insert(key.to_string(), body);
                Ok(())
            }
            async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
                Ok(self.objects.lock().unwrap().get(key).cloned())
            }
            async fn delete_object(&self, key: &str) -> anyhow::Result<bool> {
                Ok(self.objects.lock().unwrap().remove(key).is_some())
            }
            async fn public_url(&self, key: &str) -> anyhow::Result<String> {
                Ok(format!("http://localhost:8080/uploads/{}", key))
            }
            async fn upload_url(&self, _key: &str) -> anyhow::Result<String> {
                Ok("http://localhost:8080/api/upload-image".into())
            }
        }

        let config = Arc::new(AppConfig {
            webhook_url: webhook_url.to_string(),
            webhook_timeout_secs: 5,
            storage_mode: StorageMode::Local,
            upload_dir: "uploads".into(),
            public_base_url: "http://localhost:8080".into(),
            max_upload_bytes: crate::config::DEFAULT_MAX_UPLOAD_BYTES,
            s3: None,
        });

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.webhook_timeout_secs))
            .build()
            .expect("build http client");

        Self {
            config,
            storage: Arc::new(MemStorage::default()),
            store: AnalysisStore::new(),
            http,
        }
    }
}
