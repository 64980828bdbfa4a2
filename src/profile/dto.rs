use serde::{Deserialize, Serialize};

/// Request body for a profile edit. Only one field is applied per request.
#[derive(Debug, Deserialize)]
pub struct EditProfileRequest {
    pub nickname: Option<String>,
    pub picture_path: Option<String>,
}

/// Echo of the applied edit.
#[derive(Debug, Serialize)]
pub struct EditProfileResponse {
    pub username: String,
    pub nickname: Option<String>,
    pub picture_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
    pub picture_path: String,
}
