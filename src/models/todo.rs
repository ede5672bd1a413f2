use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;
use validator::Validate;

use super::{parse_id, trim_field};
use crate::database::Database;
use crate::error::ApiError;

pub const TEXT_MAX_LEN: u64 = 100;

const TODO_COLUMNS: &str = "id, text, completed, completed_at, creator";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    /// Epoch milliseconds, only set while `completed` is true
    pub completed_at: Option<i64>,
    pub creator: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct TodoDraft {
    #[validate(
        required(message = "text is required"),
        length(min = 1, max = 100, message = "text must be between 1 and 100 characters")
    )]
    pub text: Option<String>,
}

impl TodoDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()) }
    }

    fn normalize(&mut self) {
        trim_field(&mut self.text);
    }
}

/// Partial update. Fields other than `text` and `completed` are ignored.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct TodoPatch {
    #[validate(length(min = 1, max = 100, message = "text must be between 1 and 100 characters"))]
    pub text: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    fn normalize(&mut self) {
        trim_field(&mut self.text);
    }

    /// Completion state to persist. Anything but an explicit `true` reopens the todo.
    pub fn completion(&self, now: DateTime<Utc>) -> (bool, Option<i64>) {
        match self.completed {
            Some(true) => (true, Some(now.timestamp_millis())),
            _ => (false, None),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TodoFilter {
    pub creator: Option<Uuid>,
    pub completed: Option<bool>,
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TodoModel {
    db: Database,
}

impl TodoModel {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, mut draft: TodoDraft, creator: Option<Uuid>) -> Result<Todo, ApiError> {
        draft.normalize();
        draft.validate()?;
        let text = draft.text.unwrap_or_default();

        let todo = sqlx::query_as::<_, Todo>(&format!(
            "INSERT INTO todos (id, text, completed, completed_at, creator) VALUES (?, ?, FALSE, NULL, ?) RETURNING {TODO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(text)
        .bind(creator)
        .fetch_one(&self.db)
        .await?;

        tracing::debug!(todo_id = %todo.id, "Todo created");
        Ok(todo)
    }

    pub async fn list(&self, filter: &TodoFilter) -> Result<Vec<Todo>, ApiError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {TODO_COLUMNS} FROM todos WHERE 1 = 1"));

        if let Some(creator) = filter.creator {
            query.push(" AND creator = ").push_bind(creator);
        }
        if let Some(completed) = filter.completed {
            query.push(" AND completed = ").push_bind(completed);
        }
        if let Some(text) = &filter.text {
            query.push(" AND text = ").push_bind(text.clone());
        }
        query.push(" ORDER BY rowid");

        let todos = query.build_query_as::<Todo>().fetch_all(&self.db).await?;
        Ok(todos)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Todo>, ApiError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };

        let todo = sqlx::query_as::<_, Todo>(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(todo)
    }

    pub async fn update_by_id(&self, id: &str, mut patch: TodoPatch) -> Result<Option<Todo>, ApiError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };

        patch.normalize();
        patch.validate()?;
        let (completed, completed_at) = patch.completion(Utc::now());

        let todo = sqlx::query_as::<_, Todo>(&format!(
            "UPDATE todos SET
             text = COALESCE(?, text),
             completed = ?,
             completed_at = ?
             WHERE id = ?
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(patch.text)
        .bind(completed)
        .bind(completed_at)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(todo)
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<Option<Todo>, ApiError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };

        let todo = sqlx::query_as::<_, Todo>(&format!("DELETE FROM todos WHERE id = ? RETURNING {TODO_COLUMNS}"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(todo)
    }
}
