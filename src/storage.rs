use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("duplicate")]
    Duplicate,
    #[error("not_found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

/// Content-addressed storage for post images, keyed by sha256 hex.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, hash: &str, bytes: &[u8]) -> Result<(), ImageStoreError>;
    /// Returns the bytes and their sniffed MIME type.
    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), ImageStoreError>;
    async fn exists(&self, hash: &str) -> Result<bool, ImageStoreError>;
}

fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".into())
}

/// Hashes are lowercase hex; anything else never names a stored file.
fn valid_hash(hash: &str) -> bool {
    hash.len() >= 2 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

// ---------------- Filesystem implementation (default) ----------------
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.root.join(&hash[0..2]).join(hash)
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, hash: &str, bytes: &[u8]) -> Result<(), ImageStoreError> {
        if !valid_hash(hash) { return Err(ImageStoreError::Other(format!("bad hash {hash}"))); }
        let path = self.path_for(hash);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ImageStoreError::Duplicate);
        }
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| ImageStoreError::Other(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            error!("failed to write image '{}': {e}", path.display());
            ImageStoreError::Other(e.to_string())
        })
    }
    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), ImageStoreError> {
        if !valid_hash(hash) { return Err(ImageStoreError::NotFound); }
        let bytes = tokio::fs::read(self.path_for(hash)).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ImageStoreError::NotFound,
            _ => ImageStoreError::Other(e.to_string()),
        })?;
        let mime = sniff_mime(&bytes);
        Ok((bytes, mime))
    }
    async fn exists(&self, hash: &str) -> Result<bool, ImageStoreError> {
        if !valid_hash(hash) { return Ok(false); }
        tokio::fs::try_exists(self.path_for(hash)).await.map_err(|e| ImageStoreError::Other(e.to_string()))
    }
}

// ---------------- S3 implementation (MinIO compatible) ----------------
pub struct S3ImageStore {
    bucket: String,
    client: aws_sdk_s3::Client,
    prefix: String,
}

impl S3ImageStore {
    pub async fn new(endpoint: String) -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "blogicum-images".into());
        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let access = std::env::var("S3_ACCESS_KEY").unwrap_or_default();
        let secret = std::env::var("S3_SECRET_KEY").unwrap_or_default();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region))
            .endpoint_url(endpoint);
        if !access.is_empty() && !secret.is_empty() {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // path-style addressing: MinIO endpoints usually lack wildcard DNS
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf).force_path_style(true).build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);

        if let Err(e) = client.head_bucket().bucket(&bucket).send().await {
            warn!("head_bucket failed for '{bucket}', creating it: {e:?}");
            client
                .create_bucket()
                .bucket(&bucket)
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("failed to ensure bucket '{bucket}': {e}"))?;
        }
        info!("S3 image store ready (bucket '{bucket}')");
        Ok(Self { bucket, client, prefix: "images".into() })
    }

    fn key_for(&self, hash: &str) -> String {
        format!("{}/{}/{}", self.prefix, &hash[0..2], hash)
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn save(&self, hash: &str, bytes: &[u8]) -> Result<(), ImageStoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        if !valid_hash(hash) { return Err(ImageStoreError::Other(format!("bad hash {hash}"))); }
        if self.exists(hash).await? {
            return Err(ImageStoreError::Duplicate);
        }
        let key = self.key_for(hash);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(sniff_mime(bytes))
            .send()
            .await
            .map_err(|e| {
                error!("put_object failed key={key} bucket={}: {e:?}", self.bucket);
                ImageStoreError::Other(e.to_string())
            })?;
        Ok(())
    }
    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), ImageStoreError> {
        if !valid_hash(hash) { return Err(ImageStoreError::NotFound); }
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key_for(hash))
            .send()
            .await
            .map_err(|_| ImageStoreError::NotFound)?;
        let data = obj.body.collect().await.map_err(|e| ImageStoreError::Other(e.to_string()))?;
        let bytes = data.into_bytes().to_vec();
        let mime = sniff_mime(&bytes);
        Ok((bytes, mime))
    }
    async fn exists(&self, hash: &str) -> Result<bool, ImageStoreError> {
        if !valid_hash(hash) { return Ok(false); }
        Ok(self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key_for(hash))
            .send()
            .await
            .is_ok())
    }
}

/// S3 when `S3_ENDPOINT` is set, otherwise files under `MEDIA_ROOT`.
pub async fn build_image_store(settings: &Settings) -> anyhow::Result<Arc<dyn ImageStore>> {
    match std::env::var("S3_ENDPOINT") {
        Ok(endpoint) => Ok(Arc::new(S3ImageStore::new(endpoint).await?)),
        Err(_) => {
            info!("storing images under '{}'", settings.media_root.display());
            Ok(Arc::new(FsImageStore::new(settings.media_root.clone())))
        }
    }
}
