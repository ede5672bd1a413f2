use axum::{extract::State, http::StatusCode, response::Json};

use super::AppState;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::middleware::{AuthUser, AUTH_HEADER};
use crate::models::user::{LoginRequest, SignupRequest, UserResponse};

type WithToken = ([(&'static str, String); 1], Json<UserResponse>);

// Register a user and open its first session
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> Result<WithToken, ApiError> {
    let mut user = state.users.create(payload).await?;
    let token = state.users.generate_auth_token(&mut user).await?;

    Ok(([(AUTH_HEADER, token)], Json(UserResponse::from(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<WithToken, ApiError> {
    let mut user = state
        .users
        .find_by_credentials(&payload.email, &payload.password)
        .await?;
    let token = state.users.generate_auth_token(&mut user).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(([(AUTH_HEADER, token)], Json(UserResponse::from(&user))))
}

pub async fn me(AuthUser(auth): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&auth.user))
}

// Logout: drop only the token this request was made with
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
) -> Result<StatusCode, ApiError> {
    let mut user = auth.user;
    state.users.remove_token(&mut user, &auth.token).await?;

    tracing::info!(user_id = %user.id, "User logged out");
    Ok(StatusCode::OK)
}
