use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};

use super::dto::{AvatarResponse, EditProfileRequest, EditProfileResponse};
use super::services::ProfileService;
use crate::{
    auth::{dto::validate_nickname, dto::PublicUser, extractors::AuthToken},
    error::{AppError, Result},
    images::services::{upload_avatar, UploadItem, MAX_AVATAR_BYTES},
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(get_profile).put(edit_profile))
        .route(
            "/user/avatar",
            post(upload).layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 64 * 1024)),
        )
}

#[instrument(skip_all)]
pub async fn get_profile(
    State(profiles): State<ProfileService>,
    AuthToken(token): AuthToken,
) -> Result<Json<PublicUser>> {
    let user = profiles.get_profile(&token).await?;
    Ok(Json(user.into()))
}

#[instrument(skip_all)]
pub async fn edit_profile(
    State(profiles): State<ProfileService>,
    AuthToken(token): AuthToken,
    Json(payload): Json<EditProfileRequest>,
) -> Result<Json<EditProfileResponse>> {
    let nickname = payload.nickname.as_deref().map(str::trim);
    if let Some(n) = nickname {
        validate_nickname(n)?;
    }

    // Only one column is written; a non-empty nickname wins.
    let nickname = nickname.filter(|n| !n.is_empty());
    let picture_path = match nickname {
        Some(_) => None,
        None => payload.picture_path.as_deref(),
    };
    if let Some(p) = picture_path {
        if p.is_empty() || p.len() > 255 {
            return Err(AppError::InvalidInput(
                "picture_path must be 1-255 bytes".into(),
            ));
        }
    }

    let username = profiles.edit_profile(&token, nickname, picture_path).await?;
    Ok(Json(EditProfileResponse {
        username,
        nickname: nickname.map(str::to_owned),
        picture_path: picture_path.map(str::to_owned),
    }))
}

/// Multipart upload, field `avatar`.
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    mut mp: Multipart,
) -> Result<Json<AvatarResponse>> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.to_string()))?
    {
        if field.name() != Some("avatar") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        debug!(size = body.len(), content_type = %content_type, "avatar received");

        let avatar = upload_avatar(
            &state,
            &token,
            UploadItem {
                body,
                content_type: &content_type,
            },
        )
        .await?;
        return Ok(Json(AvatarResponse {
            avatar: avatar.url,
            picture_path: avatar.key,
        }));
    }
    Err(AppError::InvalidInput("avatar is required".into()))
}
