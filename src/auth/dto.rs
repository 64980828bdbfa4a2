use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;
use crate::users::UserRecord;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9]{3,64}$").unwrap();
    static ref ILLEGAL_NICKNAME_RE: Regex = Regex::new(r#"[`~!#$%^&*+=\\|{};:"',/<>?]"#).unwrap();
}

pub(crate) fn validate_username(username: &str) -> Result<(), AppError> {
    if !USERNAME_RE.is_match(username) {
        return Err(AppError::InvalidInput(
            "username must be 3-64 letters or digits".into(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(6..=20).contains(&len) {
        return Err(AppError::InvalidInput(
            "password must be 6-20 characters".into(),
        ));
    }
    Ok(())
}

/// Empty nicknames are allowed and mean "not set".
pub(crate) fn validate_nickname(nickname: &str) -> Result<(), AppError> {
    if nickname.is_empty() {
        return Ok(());
    }
    let len = nickname.chars().count();
    if !(3..=20).contains(&len) {
        return Err(AppError::InvalidInput(
            "nickname must be 3-20 characters".into(),
        ));
    }
    if ILLEGAL_NICKNAME_RE.is_match(nickname) {
        return Err(AppError::InvalidInput(
            "nickname contains illegal characters".into(),
        ));
    }
    Ok(())
}

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub nickname: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct AuthCheckResponse {
    pub username: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub picture_path: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub version: i32,
}

impl From<UserRecord> for PublicUser {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            username: u.username,
            nickname: u.nickname,
            picture_path: u.picture_path,
            created_at: u.created_at,
            updated_at: u.updated_at,
            version: u.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("user123").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dash-ed").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("secret123").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password(&"x".repeat(21)).is_err());
    }

    #[test]
    fn nicknames() {
        assert!(validate_nickname("").is_ok());
        assert!(validate_nickname("Alice").is_ok());
        assert!(validate_nickname("小明同学").is_ok());
        assert!(validate_nickname("ab").is_err());
        assert!(validate_nickname("<script>").is_err());
        assert!(validate_nickname("a'b c").is_err());
    }

    #[test]
    fn public_user_hides_credentials() {
        let user = UserRecord {
            id: 1,
            username: "alice".into(),
            password_hash: "HASH".into(),
            salt: "SALT".into(),
            nickname: "Alice".into(),
            picture_path: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            version: 1,
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("alice"));
        assert!(!json.contains("HASH"));
        assert!(!json.contains("SALT"));
    }
}
