//! User documents: credentials, password hashing and session tokens.
//!
//! A user owns an ordered list of tokens. Each entry authorizes one session and
//! is only honoured while it is both correctly signed and still in the list.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::token::TokenSigner;
use super::trim_field;
use crate::database::Database;
use crate::error::{is_unique_violation, ApiError};

/// Access tag of session tokens.
pub const AUTH_ACCESS: &str = "auth";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuthToken {
    pub access: String,
    pub token: String,
}

/// Password field of a user document.
///
/// `Plain` is a value that has been set but not yet persisted; `save` hashes it.
/// `Hashed` is what the store holds and is never hashed again.
#[derive(Clone, PartialEq, Eq)]
pub enum Password {
    Plain(String),
    Hashed(String),
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain(..)"),
            Self::Hashed(_) => f.write_str("Hashed(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    password: Password,
    pub tokens: Vec<AuthToken>,
}

impl User {
    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn set_password(&mut self, plain: impl Into<String>) {
        self.password = Password::Plain(plain.into());
    }

    pub fn is_password_modified(&self) -> bool {
        matches!(self.password, Password::Plain(_))
    }
}

/// Public JSON form of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        required(message = "email is required"),
        email(message = "email is not a valid email")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "password is required"),
        length(min = 6, message = "password must be at least 6 characters")
    )]
    pub password: Option<String>,
}

impl SignupRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn normalize(&mut self) {
        trim_field(&mut self.email);
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password: String,
}

#[derive(Debug, Clone)]
pub struct UserModel {
    db: Database,
    signer: TokenSigner,
    hash_cost: u32,
}

impl UserModel {
    pub fn new(db: Database, signer: TokenSigner) -> Self {
        Self {
            db,
            signer,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn create(&self, mut request: SignupRequest) -> Result<User, ApiError> {
        request.normalize();
        request.validate()?;

        let email = request.email.unwrap_or_default();
        if self.find_by_email(&email).await?.is_some() {
            return Err(duplicate_email());
        }

        let mut user = User {
            id: Uuid::new_v4(),
            email,
            password: Password::Plain(request.password.unwrap_or_default()),
            tokens: Vec::new(),
        };
        self.save(&mut user).await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Upsert the user document. The password is hashed only when it was changed
    /// since the last save.
    pub async fn save(&self, user: &mut User) -> Result<(), ApiError> {
        let hash = match &user.password {
            Password::Plain(plain) => hash_password(plain.clone(), self.hash_cost).await?,
            Password::Hashed(hash) => hash.clone(),
        };

        sqlx::query(
            "INSERT INTO users (id, email, password) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, password = excluded.password",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&hash)
        .execute(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                duplicate_email()
            } else {
                ApiError::Database(err)
            }
        })?;

        user.password = Password::Hashed(hash);
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, email, password FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        self.hydrate(row).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, email, password FROM users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(&self.db)
            .await?;

        self.hydrate(row).await
    }

    /// Unknown email and wrong password fail the same way.
    pub async fn find_by_credentials(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        let Password::Hashed(hash) = &user.password else {
            return Err(ApiError::InvalidCredentials);
        };

        match verify_password(password.to_owned(), hash.clone()).await? {
            Ok(true) => Ok(user),
            Ok(false) => Err(ApiError::InvalidCredentials),
            Err(err) => {
                tracing::warn!("Stored password hash could not be checked: {:?}", err);
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    /// Resolve a session token. The signature and expiry are checked first, then
    /// the access tag, and only then is the embedded id trusted to look up the
    /// stored token list.
    pub async fn find_by_token(&self, token: &str) -> Result<User, ApiError> {
        let claims = self.signer.verify(token).map_err(|err| {
            tracing::warn!("Token rejected: {}", err);
            ApiError::Unauthorized
        })?;

        if claims.access != AUTH_ACCESS {
            tracing::warn!("Token issued for access {:?}", claims.access);
            return Err(ApiError::Unauthorized);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)?;

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT u.id, u.email, u.password
             FROM users u
             JOIN user_tokens t ON t.user_id = u.id
             WHERE u.id = ? AND t.token = ? AND t.access = ?",
        )
        .bind(user_id)
        .bind(token)
        .bind(AUTH_ACCESS)
        .fetch_optional(&self.db)
        .await?;

        self.hydrate(row).await?.ok_or(ApiError::Unauthorized)
    }

    /// Issue a session token, persist it on the user and return it.
    pub async fn generate_auth_token(&self, user: &mut User) -> Result<String, ApiError> {
        let token = self.signer.issue(user.id, AUTH_ACCESS)?;

        sqlx::query("INSERT INTO user_tokens (user_id, access, token) VALUES (?, ?, ?)")
            .bind(user.id)
            .bind(AUTH_ACCESS)
            .bind(&token)
            .execute(&self.db)
            .await?;

        user.tokens.push(AuthToken {
            access: AUTH_ACCESS.to_string(),
            token: token.clone(),
        });

        tracing::debug!(user_id = %user.id, "Auth token issued");
        Ok(token)
    }

    /// Remove one token by exact match. Removing a token that is not there is fine.
    pub async fn remove_token(&self, user: &mut User, token: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM user_tokens WHERE user_id = ? AND token = ?")
            .bind(user.id)
            .bind(token)
            .execute(&self.db)
            .await?;

        user.tokens.retain(|entry| entry.token != token);
        Ok(())
    }

    async fn hydrate(&self, row: Option<UserRow>) -> Result<Option<User>, ApiError> {
        let Some(row) = row else {
            return Ok(None);
        };

        let tokens = sqlx::query_as::<_, AuthToken>(
            "SELECT access, token FROM user_tokens WHERE user_id = ? ORDER BY seq",
        )
        .bind(row.id)
        .fetch_all(&self.db)
        .await?;

        Ok(Some(User {
            id: row.id,
            email: row.email,
            password: Password::Hashed(row.password),
            tokens,
        }))
    }
}

// bcrypt is CPU-bound; keep it off the async workers
async fn hash_password(plain: String, cost: u32) -> Result<String, ApiError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost)).await??;
    Ok(hash)
}

async fn verify_password(
    plain: String,
    hash: String,
) -> Result<Result<bool, bcrypt::BcryptError>, ApiError> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash)).await?)
}

fn duplicate_email() -> ApiError {
    ApiError::field("email", "unique", "email is already registered")
}
