use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, TokenResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        services::{authenticate, issue_token},
    },
    error::ApiError,
    state::AppState,
    users::services::required,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(payload) = payload?;
    let username = required(payload.username, "username")?;
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("Missing field: password"))?;

    let user = authenticate(state.users.as_ref(), &username, &password).await?;
    let auth_token = issue_token(&JwtKeys::from_ref(&state), &user)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(TokenResponse { auth_token }))
}

/// Trades a still-valid token for a fresh one.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<TokenResponse>, ApiError> {
    let auth_token = issue_token(&JwtKeys::from_ref(&state), &user)?;
    Ok(Json(TokenResponse { auth_token }))
}
