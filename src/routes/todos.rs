use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};

use super::AppState;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::middleware::MaybeAuthUser;
use crate::models::todo::{Todo, TodoDraft, TodoFilter, TodoPatch};

// Create a todo; owned by the caller when an x-auth token is sent
pub async fn create_todo(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    JsonBody(payload): JsonBody<TodoDraft>,
) -> Result<Json<Todo>, ApiError> {
    let creator = auth.map(|auth| auth.user.id);
    let todo = state.todos.create(payload, creator).await?;

    Ok(Json(todo))
}

pub async fn list_todos(
    State(state): State<AppState>,
    Query(filter): Query<TodoFilter>,
) -> Result<Json<Value>, ApiError> {
    let todos = state.todos.list(&filter).await?;

    Ok(Json(json!({ "todos": todos })))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.todos.get_by_id(&id).await? {
        Some(todo) => Ok(Json(json!({ "todo": todo }))),
        None => Err(ApiError::NotFound),
    }
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.todos.delete_by_id(&id).await? {
        Some(todo) => {
            tracing::info!(todo_id = %todo.id, "Todo deleted");
            Ok(Json(json!({ "todo": todo })))
        }
        None => Err(ApiError::NotFound),
    }
}

// The body is read raw so that a malformed or unknown id answers 404 before the body is looked at
pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    if state.todos.get_by_id(&id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let patch = parse_patch(&body)?;

    match state.todos.update_by_id(&id, patch).await? {
        Some(todo) => Ok(Json(json!({ "todo": todo }))),
        None => Err(ApiError::NotFound),
    }
}

fn parse_patch(body: &[u8]) -> Result<TodoPatch, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TodoPatch::default());
    }

    serde_json::from_slice(body).map_err(|err| ApiError::Body(err.to_string()))
}
