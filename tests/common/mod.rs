//! Shared fixtures for the HTTP tests.
//!
//! Every test gets its own in-memory store seeded with two users (the first
//! one logged in once) and two todos (the second one completed).

#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use chrono::Duration;
use uuid::Uuid;

use todo_api::database::{connect_in_memory, run_migrations, Database};
use todo_api::middleware::AUTH_HEADER;
use todo_api::models::todo::{Todo, TodoDraft, TodoPatch};
use todo_api::models::token::TokenSigner;
use todo_api::models::user::SignupRequest;
use todo_api::{app, AppState};

pub const TEST_SECRET: &[u8] = b"abc123";

/// Lowest cost bcrypt accepts; keeps the suite fast.
pub const TEST_HASH_COST: u32 = 4;

pub struct SeedUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub token: Option<String>,
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub users: Vec<SeedUser>,
    pub todos: Vec<Todo>,
}

pub fn signer() -> TokenSigner {
    TokenSigner::new(TEST_SECRET, Duration::hours(1))
}

pub async fn test_state() -> AppState {
    test_store().await.1
}

/// The state together with a handle on its store, for tests that write rows directly.
pub async fn test_store() -> (Database, AppState) {
    let db = connect_in_memory().await.expect("in-memory database");
    run_migrations(&db).await.expect("migrations");
    let state = AppState::new(db.clone(), signer(), TEST_HASH_COST);
    (db, state)
}

pub async fn spawn_app() -> TestApp {
    let state = test_state().await;
    let users = populate_users(&state).await;
    let todos = populate_todos(&state, &users).await;
    let server = TestServer::new(app(state.clone())).expect("test server");

    TestApp {
        server,
        state,
        users,
        todos,
    }
}

async fn populate_users(state: &AppState) -> Vec<SeedUser> {
    let mut seeded = Vec::new();

    for (index, (email, password)) in [("andrew@example.com", "userOnePass"), ("jen@example.com", "userTwoPass")]
        .into_iter()
        .enumerate()
    {
        let mut user = state
            .users
            .create(SignupRequest::new(email, password))
            .await
            .expect("seed user");

        let token = if index == 0 {
            Some(state.users.generate_auth_token(&mut user).await.expect("seed token"))
        } else {
            None
        };

        seeded.push(SeedUser {
            id: user.id,
            email: email.to_string(),
            password: password.to_string(),
            token,
        });
    }

    seeded
}

async fn populate_todos(state: &AppState, users: &[SeedUser]) -> Vec<Todo> {
    let first = state
        .todos
        .create(TodoDraft::new("First test todo"), Some(users[0].id))
        .await
        .expect("seed todo");

    let second = state
        .todos
        .create(TodoDraft::new("Second test todo"), Some(users[1].id))
        .await
        .expect("seed todo");
    let second = state
        .todos
        .update_by_id(
            &second.id.to_string(),
            TodoPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("seed todo update")
        .expect("seed todo exists");

    vec![first, second]
}

pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(AUTH_HEADER),
        HeaderValue::from_str(token).expect("token is a valid header value"),
    )
}
