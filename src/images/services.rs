use anyhow::Context;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::{avatar_key, ImageFormat};

/// Largest accepted avatar upload.
pub const MAX_AVATAR_BYTES: usize = 20 * 1024 * 1024;

pub struct UploadItem<'a> {
    pub body: Bytes,
    pub content_type: &'a str,
}

/// Uploaded avatar: object key (stored as picture path) and a presigned URL.
#[derive(Debug)]
pub struct Avatar {
    pub key: String,
    pub url: String,
}

/// Stores the image, points the profile at it, and returns a presigned URL.
///
/// The token is resolved before anything is uploaded. The object is removed
/// again only if the profile row was not updated; once the row references the
/// key the object stays, even when the edit reports a cache failure.
pub async fn upload_avatar(st: &AppState, token: &str, img: UploadItem<'_>) -> Result<Avatar> {
    st.auth.resolve(token).await?;

    let format = ImageFormat::from_mime(img.content_type).ok_or_else(|| {
        AppError::InvalidInput("avatar must be a png, jpg or jpeg image".into())
    })?;
    if img.body.is_empty() {
        return Err(AppError::InvalidInput("avatar is empty".into()));
    }
    if img.body.len() > MAX_AVATAR_BYTES {
        return Err(AppError::InvalidInput("avatar exceeds 20MB".into()));
    }

    let key = avatar_key(OffsetDateTime::now_utc(), Uuid::new_v4(), format);
    st.avatars
        .put_avatar(&key, img.body, format)
        .await
        .map_err(AppError::Upload)?;

    let committed = match st.profiles.apply_edit(token, None, Some(&key)).await {
        Ok(c) => c,
        Err(e) => {
            if let Err(cleanup) = st.avatars.remove_avatar(&key).await {
                warn!(error = %cleanup, key = %key, "orphaned avatar object");
            }
            return Err(e);
        }
    };
    if let Some(e) = committed.stale_cache {
        return Err(e.into());
    }

    let url = st
        .avatars
        .avatar_url(&key, st.config.storage.url_ttl())
        .await
        .with_context(|| format!("presign url for {}", key))
        .map_err(|e| {
            error!(error = %e, "avatar presign failed");
            AppError::Upload(e)
        })?;

    Ok(Avatar { key, url })
}
