//! File storage — where message attachments and resumes end up.
//!
//! The mentorship core only ever keeps the returned reference. Two backends:
//! - **S3 / MinIO** via `aws-sdk-s3` when `storage.endpoint` is configured;
//! - **local directory** in lite mode, served back by the API under `/files`.

use anyhow::{Context, Result};
use aws_sdk_s3::{
    Client,
    config::{Builder as S3Builder, Credentials, Region},
    primitives::ByteStream,
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Where an upload was stored and how to fetch it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Storage key relative to the bucket / data dir
    pub key: String,
    /// Retrievable reference handed to clients
    pub url: String,
}

/// Configured storage backend.
#[derive(Clone)]
pub enum FileStore {
    S3(S3Store),
    Local(LocalStore),
}

impl FileStore {
    /// Pick the backend from config: S3 when an endpoint is set, local disk otherwise.
    pub fn from_config(cfg: &alumni_common::config::StorageConfig) -> Result<Self> {
        if cfg.endpoint.trim().is_empty() {
            tracing::info!(dir = %cfg.data_dir, "Using local file storage");
            Ok(Self::Local(LocalStore::new(&cfg.data_dir, "/files")))
        } else {
            tracing::info!(bucket = %cfg.bucket, "Using S3 file storage");
            Ok(Self::S3(S3Store::new(cfg)))
        }
    }

    /// Store `data` under `prefix/<uuid>/<sanitized name>`.
    pub async fn put(
        &self,
        prefix: &str,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<StoredObject> {
        let key = object_key(prefix, Uuid::now_v7(), file_name);
        match self {
            Self::S3(s3) => s3.put_object(&key, data, content_type).await,
            Self::Local(local) => local.put_object(&key, data).await,
        }
    }

    /// Remove a stored object by key. Missing objects are not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Self::S3(s3) => s3.delete_object(key).await,
            Self::Local(local) => local.delete_object(key).await,
        }
    }

    /// Prepare the backend at startup (create bucket / directory).
    pub async fn ensure_ready(&self) -> Result<()> {
        match self {
            Self::S3(s3) => s3.ensure_bucket().await,
            Self::Local(local) => local.ensure_dir().await,
        }
    }

    /// Root directory to serve files from, for the local backend.
    pub fn local_root(&self) -> Option<&Path> {
        match self {
            Self::S3(_) => None,
            Self::Local(local) => Some(&local.root),
        }
    }
}

/// Build a storage key, keeping only filename characters that are safe in
/// both URLs and paths.
pub fn object_key(prefix: &str, id: Uuid, file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let clean = clean.trim_start_matches('.');
    let clean = if clean.is_empty() { "upload" } else { clean };
    format!("{}/{id}/{clean}", prefix.trim_matches('/'))
}

// ────────────────────────────────────────────────────────────────────
// S3 / MinIO
// ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct S3Store {
    inner: Client,
    bucket: String,
    base_url: String,
}

impl S3Store {
    pub fn new(cfg: &alumni_common::config::StorageConfig) -> Self {
        let creds = Credentials::new(
            &cfg.access_key,
            &cfg.secret_key,
            None, // session token
            None, // expiry
            "alumni-storage",
        );

        let s3_cfg = S3Builder::new()
            .endpoint_url(&cfg.endpoint)
            .credentials_provider(creds)
            .region(Region::new(cfg.region.clone()))
            // Force path-style URLs (required for MinIO)
            .force_path_style(true)
            .build();

        let base = cfg.public_url.as_deref().unwrap_or(&cfg.endpoint);

        Self {
            inner: Client::from_conf(s3_cfg),
            bucket: cfg.bucket.clone(),
            base_url: format!("{}/{}", base.trim_end_matches('/'), cfg.bucket),
        }
    }

    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject> {
        self.inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .with_context(|| format!("Failed to upload {key} to object storage"))?;

        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{key}", self.base_url),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete {key} from object storage"))?;
        Ok(())
    }

    /// Ensure the bucket exists; create it if absent.
    async fn ensure_bucket(&self) -> Result<()> {
        match self.inner.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::debug!(bucket = %self.bucket, "Bucket already exists");
                Ok(())
            }
            Err(_) => {
                tracing::info!(bucket = %self.bucket, "Bucket does not exist, creating");
                self.inner
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .context("Failed to create object storage bucket")?;
                Ok(())
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────
// Local directory (lite mode)
// ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LocalStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<StoredObject> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{key}", self.url_prefix),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let path = self.root.join(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create {}", self.root.display()))
    }
}
