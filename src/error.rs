use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::cache::CacheError;
use crate::users::StoreError;

/// Outcome taxonomy shared by the services and the HTTP layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("user not found")]
    NotFound,

    #[error("username already exists")]
    AlreadyExists,

    #[error("unauthenticated")]
    Unauthenticated,

    /// Lost an optimistic-lock race. The caller may retry.
    #[error("profile was modified concurrently, retry")]
    VersionConflict,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store error: {0}")]
    Store(#[source] StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("upload error: {0}")]
    Upload(#[source] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists => AppError::AlreadyExists,
            StoreError::VersionConflict => AppError::VersionConflict,
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    /// True for infrastructure failures as opposed to ordinary outcomes.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Store(_) | AppError::Cache(_) | AppError::Upload(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::AlreadyExists => (StatusCode::CONFLICT, self.to_string()),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::VersionConflict => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvalidCredential => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Store(_) | AppError::Cache(_) | AppError::Upload(_) => {
                tracing::error!(error = %self, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_outcomes_keep_their_meaning() {
        assert!(matches!(
            AppError::from(StoreError::AlreadyExists),
            AppError::AlreadyExists
        ));
        assert!(matches!(
            AppError::from(StoreError::VersionConflict),
            AppError::VersionConflict
        ));
        let infra = AppError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert!(infra.is_internal());
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::AlreadyExists, StatusCode::CONFLICT),
            (AppError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (AppError::VersionConflict, StatusCode::CONFLICT),
            (AppError::InvalidCredential, StatusCode::FORBIDDEN),
            (
                AppError::InvalidInput("bad".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Cache(CacheError::Backend("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
