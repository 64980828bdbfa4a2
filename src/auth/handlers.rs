use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            validate_nickname, validate_password, validate_username, AuthCheckResponse,
            LoginRequest, LoginResponse, PublicUser, RegisterRequest,
        },
        extractors::AuthToken,
        services::AuthService,
    },
    error::Result,
    profile::services::ProfileService,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/auth", get(check))
}

#[instrument(skip(profiles, payload), fields(username = %payload.username))]
pub async fn register(
    State(profiles): State<ProfileService>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>)> {
    let username = payload.username.trim();
    let nickname = payload.nickname.trim();
    validate_username(username)?;
    validate_password(&payload.password)?;
    validate_nickname(nickname)?;

    let user = profiles
        .create_profile(username, &payload.password, nickname)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(auth, payload), fields(username = %payload.username))]
pub async fn login(
    State(auth): State<AuthService>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let username = payload.username.trim();
    validate_username(username)?;
    validate_password(&payload.password)?;

    let (user, token) = auth.login(username, &payload.password).await?;
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip_all)]
pub async fn logout(State(auth): State<AuthService>, AuthToken(token): AuthToken) -> Result<StatusCode> {
    auth.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn check(
    State(auth): State<AuthService>,
    AuthToken(token): AuthToken,
) -> Result<Json<AuthCheckResponse>> {
    let username = auth.resolve(&token).await?;
    info!(username, "auth check passed");
    Ok(Json(AuthCheckResponse { username }))
}
