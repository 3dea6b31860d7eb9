use std::path::PathBuf;

use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use async_trait::async_trait;
use bytes::Bytes;

/// Storage keys are single flat path segments. Route parameters and analyze
/// locators arrive user-chosen, so anything carrying a path separator or a
/// parent reference is rejected before it can escape the upload directory.
pub fn is_safe_object_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['/', '\\']) && !key.contains("..")
}

/// Backing store for uploaded images. Keys are opaque path segments; impls
/// backed by a filesystem must hold the `is_safe_object_key` line themselves
/// since not every caller generates its keys.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    /// `Ok(None)` means the key was never stored (or already deleted).
    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<bool>;
    /// URL a client can GET later to retrieve the object.
    async fn public_url(&self, key: &str) -> anyhow::Result<String>;
    /// Destination for the client to PUT raw bytes into.
    async fn upload_url(&self, key: &str) -> anyhow::Result<String>;
}

/// S3/MinIO-backed storage.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

const PRESIGN_TTL_SECS: u64 = 30 * 60;

impl S3Storage {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        let out = match resp {
            Ok(out) => out,
            Err(e) => {
                if e.as_service_error().map_or(false, |se| se.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(anyhow::Error::from(e).context("s3 get_object"));
            }
        };
        let data = out.body.collect().await.context("s3 read body")?;
        Ok(Some(data.into_bytes()))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<bool> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        // S3 deletes are idempotent and do not report prior existence.
        Ok(true)
    }

    async fn public_url(&self, key: &str) -> anyhow::Result<String> {
        let req = self.client.get_object().bucket(&self.bucket).key(key);
        let presigned = req
            .presigned(PresigningConfig::expires_in(
                std::time::Duration::from_secs(PRESIGN_TTL_SECS),
            )?)
            .await
            .context("s3 presign get")?;
        Ok(presigned.uri().to_string())
    }

    async fn upload_url(&self, key: &str) -> anyhow::Result<String> {
        let req = self.client.put_object().bucket(&self.bucket).key(key);
        let presigned = req
            .presigned(PresigningConfig::expires_in(
                std::time::Duration::from_secs(PRESIGN_TTL_SECS),
            )?)
            .await
            .context("s3 presign put")?;
        Ok(presigned.uri().to_string())
    }
}

/// Local-disk storage for development and single-node deployments. Objects
/// live as flat files under `root`; the public URL points back at our own
/// `/uploads/:key` route.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalDiskStorage {
    pub fn new(root: PathBuf, base_url: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl StorageClient for LocalDiskStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        anyhow::ensure!(is_safe_object_key(key), "invalid object key: {}", key);
        let path = self.path_for(key);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        if !is_safe_object_key(key) {
            return Ok(None);
        }
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::from(e).context(format!("read {}", path.display()))),
        }
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<bool> {
        if !is_safe_object_key(key) {
            return Ok(false);
        }
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow::Error::from(e).context(format!("remove {}", path.display()))),
        }
    }

    async fn public_url(&self, key: &str) -> anyhow::Result<String> {
        Ok(format!("{}/uploads/{}", self.base_url, key))
    }

    async fn upload_url(&self, _key: &str) -> anyhow::Result<String> {
        // Local mode has no presigning; clients PUT straight at us.
        Ok(format!("{}/api/upload-image", self.base_url))
    }
}
