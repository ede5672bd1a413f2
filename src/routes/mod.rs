pub mod todos;
pub mod users;

use axum::{
    http::{HeaderName, StatusCode},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::database::Database;
use crate::middleware::{auth_middleware, AUTH_HEADER};
use crate::models::todo::TodoModel;
use crate::models::token::TokenSigner;
use crate::models::user::UserModel;

/// Handles shared by every request. Cloning is cheap; the pool is reference counted.
#[derive(Clone, Debug)]
pub struct AppState {
    pub todos: TodoModel,
    pub users: UserModel,
}

impl AppState {
    pub fn new(db: Database, signer: TokenSigner, hash_cost: u32) -> Self {
        Self {
            todos: TodoModel::new(db.clone()),
            users: UserModel::new(db, signer).with_hash_cost(hash_cost),
        }
    }
}

async fn handle_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub fn app(state: AppState) -> Router {
    // Allow any frontend origin; the token header must be readable by the browser
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(AUTH_HEADER)]);

    let protected = Router::new()
        .route("/users/me", get(users::me))
        .route("/users/me/token", delete(users::logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        // Todo routes
        .route("/todos", post(todos::create_todo).get(todos::list_todos))
        .route(
            "/todos/:id",
            get(todos::get_todo)
                .delete(todos::delete_todo)
                .patch(todos::update_todo),
        )
        // User routes
        .route("/users", post(users::signup))
        .route("/users/login", post(users::login))
        .merge(protected)
        .fallback(handle_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
