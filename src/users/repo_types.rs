use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User row as stored in a partition table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String, // argon2 PHC string
    pub salt: String,
    pub nickname: String,
    pub picture_path: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub version: i32, // bumped by exactly 1 on every successful update
}

/// Profile columns that may be changed after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Nickname,
    PicturePath,
}

impl ProfileField {
    pub fn column(self) -> &'static str {
        match self {
            ProfileField::Nickname => "nickname",
            ProfileField::PicturePath => "picture_path",
        }
    }
}
