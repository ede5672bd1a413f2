//! Todo/User REST backend.
//!
//! - **`models`** - Todo and User documents and their store operations
//! - **`middleware`** - `x-auth` token authentication
//! - **`routes`** - HTTP surface, `AppState` and router construction
//! - **`database`** - store connection lifecycle and migrations
//! - **`config`** / **`error`** - environment settings and the error taxonomy

pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::ApiError;
pub use routes::{app, AppState};
