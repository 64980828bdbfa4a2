//! Avatar objects in an S3-compatible bucket (MinIO in development).
//!
//! Keys are dated and carry a fresh UUID, so an object is never overwritten.
//! The bucket is private; clients only ever see presigned GET links.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StorageConfig;

const AVATAR_PREFIX: &str = "avatars";

// Keys are never reused, so a fetched avatar never changes.
const AVATAR_CACHE_CONTROL: &str = "private, max-age=31536000, immutable";

/// Accepted avatar encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn from_mime(content_type: &str) -> Option<Self> {
        match content_type {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn ext(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// `avatars/YYYY/MM/DD/<uuid>.<ext>`. This is also the stored picture path.
pub fn avatar_key(now: OffsetDateTime, id: Uuid, format: ImageFormat) -> String {
    format!(
        "{AVATAR_PREFIX}/{:04}/{:02}/{:02}/{}.{}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        id,
        format.ext()
    )
}

#[async_trait]
pub trait AvatarStore: Send + Sync {
    async fn put_avatar(&self, key: &str, body: Bytes, format: ImageFormat) -> anyhow::Result<()>;

    /// Removing a missing object succeeds.
    async fn remove_avatar(&self, key: &str) -> anyhow::Result<()>;

    /// Time-limited GET link for a stored avatar.
    async fn avatar_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct S3AvatarStore {
    client: Client,
    bucket: String,
}

impl S3AvatarStore {
    /// Builds the client and creates the bucket if it does not exist yet.
    pub async fn connect(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "minio",
            ))
            .load()
            .await;

        // MinIO serves buckets by path, not by virtual host.
        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        let store = Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        };
        store.ensure_bucket().await?;
        Ok(store)
    }

    async fn ensure_bucket(&self) -> anyhow::Result<()> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            debug!(bucket = %self.bucket, "avatar bucket present");
            return Ok(());
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .with_context(|| format!("create bucket {}", self.bucket))?;
        info!(bucket = %self.bucket, "avatar bucket created");
        Ok(())
    }
}

#[async_trait]
impl AvatarStore for S3AvatarStore {
    async fn put_avatar(&self, key: &str, body: Bytes, format: ImageFormat) -> anyhow::Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(format.content_type())
            .cache_control(AVATAR_CACHE_CONTROL)
            .send()
            .await
            .with_context(|| format!("upload avatar {key}"))?;
        debug!(key, size, "avatar stored");
        Ok(())
    }

    async fn remove_avatar(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("remove avatar {key}"))?;
        debug!(key, "avatar removed");
        Ok(())
    }

    async fn avatar_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String> {
        let presigning = PresigningConfig::expires_in(ttl).context("avatar url ttl")?;
        let req = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .with_context(|| format!("presign avatar {key}"))?;
        Ok(req.uri().to_string())
    }
}
