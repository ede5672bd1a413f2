//! Authentication Middleware
//!
//! Protects routes that require a session. The token travels in the `x-auth`
//! header; it is resolved to a user and the pair is attached to the request
//! extensions for handlers to pick up through `AuthUser`.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::models::user::User;
use crate::routes::AppState;

/// Request and response header carrying the session token.
pub const AUTH_HEADER: &str = "x-auth";

/// User resolved from the request's token, together with that token.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

async fn authenticate(state: &AppState, token: String) -> Result<AuthenticatedUser, ApiError> {
    match state.users.find_by_token(&token).await {
        Ok(user) => Ok(AuthenticatedUser { user, token }),
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
        Err(err) => {
            tracing::error!("Token lookup failed: {:?}", err);
            Err(ApiError::Unauthorized)
        }
    }
}

/// Rejects with 401 unless the request carries a token that resolves to a user.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(request.headers()).ok_or_else(|| {
        tracing::warn!("Missing {} header", AUTH_HEADER);
        ApiError::Unauthorized
    })?;

    let authenticated = authenticate(&state, token).await?;
    request.extensions_mut().insert(authenticated);

    Ok(next.run(request).await)
}

/// Extractor for handlers behind `auth_middleware`.
#[derive(Clone, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                tracing::warn!("AuthenticatedUser not found in request extensions");
                ApiError::Unauthorized
            })
    }
}

/// Resolves the token when one is sent, for routes open to anonymous callers.
/// A missing header, or one that does not authenticate, is `None`.
#[derive(Clone, Debug)]
pub struct MaybeAuthUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_headers(&parts.headers) else {
            return Ok(Self(None));
        };

        match authenticate(state, token).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(_) => {
                tracing::warn!("Ignoring {} header that does not authenticate", AUTH_HEADER);
                Ok(Self(None))
            }
        }
    }
}
