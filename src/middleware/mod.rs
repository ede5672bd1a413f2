pub mod auth;

pub use auth::{auth_middleware, AuthUser, AuthenticatedUser, MaybeAuthUser, AUTH_HEADER};
