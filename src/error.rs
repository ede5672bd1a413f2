//! Error taxonomy shared by models, middleware and route handlers.
//!
//! Every variant maps to exactly one HTTP status. Not-found, unauthorized and
//! credential failures carry an empty body: a malformed id answers exactly like
//! a missing document, and an unknown email exactly like a wrong password.

use std::borrow::Cow;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("malformed request body: {0}")]
    Body(String),

    #[error("document not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    /// Single-field validation failure, shaped like the ones produced by `#[derive(Validate)]`.
    pub fn field(field: &'static str, code: &'static str, message: &'static str) -> Self {
        let mut error = ValidationError::new(code);
        error.message = Some(Cow::Borrowed(message));

        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        Self::Validation(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Body(_) | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Hash(_) | Self::Token(_) | Self::Task(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            Self::Validation(errors) => (status, Json(json!({ "errors": errors }))).into_response(),
            Self::Body(message) => (status, Json(json!({ "message": message }))).into_response(),
            Self::Database(ref err) => {
                tracing::error!("Database error: {:?}", err);
                status.into_response()
            }
            Self::Hash(ref err) => {
                tracing::error!("Password hashing error: {:?}", err);
                status.into_response()
            }
            Self::Token(ref err) => {
                tracing::error!("Token signing error: {:?}", err);
                status.into_response()
            }
            Self::Task(ref err) => {
                tracing::error!("Blocking task error: {:?}", err);
                status.into_response()
            }
            Self::NotFound | Self::InvalidCredentials | Self::Unauthorized => status.into_response(),
        }
    }
}

/// True when the store rejected a write because of a unique index.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
