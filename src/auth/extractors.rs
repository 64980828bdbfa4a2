use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::error::AppError;

/// Session token taken from the `Authorization` header.
///
/// Accepts the bare token or `Bearer <token>`. Only presence is checked here;
/// the token is resolved by the services.
pub struct AuthToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .unwrap_or_default();

        let token = raw
            .strip_prefix("Bearer ")
            .or_else(|| raw.strip_prefix("bearer "))
            .unwrap_or(raw)
            .trim();

        if token.is_empty() {
            warn!("missing Authorization token");
            return Err(AppError::Unauthenticated);
        }
        Ok(AuthToken(token.to_owned()))
    }
}
