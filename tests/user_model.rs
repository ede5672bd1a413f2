mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;

use common::{signer, test_state, test_store, TEST_SECRET};
use todo_api::error::ApiError;
use todo_api::models::token::TokenSigner;
use todo_api::models::user::{Password, SignupRequest};

fn hash_of(password: &Password) -> String {
    match password {
        Password::Hashed(hash) => hash.clone(),
        Password::Plain(_) => panic!("expected a hashed password"),
    }
}

#[tokio::test]
async fn resaving_unchanged_user_keeps_hash() {
    let state = test_state().await;
    let mut user = state
        .users
        .create(SignupRequest::new("a@example.com", "secret1"))
        .await
        .unwrap();
    let original = hash_of(user.password());

    user.email = "b@example.com".to_string();
    state.users.save(&mut user).await.unwrap();

    let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.email, "b@example.com");
    assert_eq!(hash_of(stored.password()), original);
    assert!(state.users.find_by_credentials("b@example.com", "secret1").await.is_ok());
}

#[tokio::test]
async fn changing_password_rehashes() {
    let state = test_state().await;
    let mut user = state
        .users
        .create(SignupRequest::new("a@example.com", "secret1"))
        .await
        .unwrap();
    let original = hash_of(user.password());

    user.set_password("secret2");
    state.users.save(&mut user).await.unwrap();

    assert!(!user.is_password_modified());
    assert_ne!(hash_of(user.password()), original);
    assert!(state.users.find_by_credentials("a@example.com", "secret2").await.is_ok());
    assert!(matches!(
        state.users.find_by_credentials("a@example.com", "secret1").await,
        Err(ApiError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn remove_token_is_idempotent() {
    let state = test_state().await;
    let mut user = state
        .users
        .create(SignupRequest::new("a@example.com", "secret1"))
        .await
        .unwrap();
    let token = state.users.generate_auth_token(&mut user).await.unwrap();

    state.users.remove_token(&mut user, &token).await.unwrap();
    state.users.remove_token(&mut user, &token).await.unwrap();
    state.users.remove_token(&mut user, "never-issued").await.unwrap();

    assert!(user.tokens.is_empty());
    assert!(matches!(
        state.users.find_by_token(&token).await,
        Err(ApiError::Unauthorized)
    ));
}

#[tokio::test]
async fn tokens_keep_issue_order() {
    let state = test_state().await;
    let mut user = state
        .users
        .create(SignupRequest::new("a@example.com", "secret1"))
        .await
        .unwrap();

    let first = state.users.generate_auth_token(&mut user).await.unwrap();
    let second = state.users.generate_auth_token(&mut user).await.unwrap();

    let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
    let tokens: Vec<_> = stored.tokens.iter().map(|entry| entry.token.clone()).collect();
    assert_eq!(tokens, vec![first, second]);
}

#[tokio::test]
async fn well_signed_token_not_in_list_is_rejected() {
    let state = test_state().await;
    let user = state
        .users
        .create(SignupRequest::new("a@example.com", "secret1"))
        .await
        .unwrap();

    let forged = signer().issue(user.id, "auth").unwrap();
    assert!(matches!(
        state.users.find_by_token(&forged).await,
        Err(ApiError::Unauthorized)
    ));
}

#[tokio::test]
async fn token_for_other_access_is_rejected() {
    let state = test_state().await;
    let mut user = state
        .users
        .create(SignupRequest::new("a@example.com", "secret1"))
        .await
        .unwrap();
    state.users.generate_auth_token(&mut user).await.unwrap();

    let reset = signer().issue(user.id, "reset").unwrap();
    assert!(matches!(
        state.users.find_by_token(&reset).await,
        Err(ApiError::Unauthorized)
    ));
}

#[tokio::test]
async fn stored_but_expired_token_is_rejected() {
    let (db, state) = test_store().await;
    let mut user = state
        .users
        .create(SignupRequest::new("a@example.com", "secret1"))
        .await
        .unwrap();
    let token = state.users.generate_auth_token(&mut user).await.unwrap();
    assert_eq!(state.users.find_by_token(&token).await.unwrap().id, user.id);

    let expired = TokenSigner::new(TEST_SECRET, Duration::hours(-1));
    let stale = expired.issue(user.id, "auth").unwrap();
    sqlx::query("INSERT INTO user_tokens (user_id, access, token) VALUES (?, ?, ?)")
        .bind(user.id)
        .bind("auth")
        .bind(&stale)
        .execute(&db)
        .await
        .unwrap();

    let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.tokens.iter().any(|entry| entry.token == stale));
    assert!(matches!(
        state.users.find_by_token(&stale).await,
        Err(ApiError::Unauthorized)
    ));
    assert_eq!(state.users.find_by_token(&token).await.unwrap().id, user.id);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_fail_alike() {
    let state = test_state().await;
    state
        .users
        .create(SignupRequest::new("a@example.com", "secret1"))
        .await
        .unwrap();

    assert!(matches!(
        state.users.find_by_credentials("a@example.com", "secret2").await,
        Err(ApiError::InvalidCredentials)
    ));
    assert!(matches!(
        state.users.find_by_credentials("nobody@example.com", "secret1").await,
        Err(ApiError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn duplicate_email_is_a_validation_error() {
    let state = test_state().await;
    state
        .users
        .create(SignupRequest::new("a@example.com", "secret1"))
        .await
        .unwrap();

    let err = state
        .users
        .create(SignupRequest::new(" a@example.com ", "secret2"))
        .await
        .unwrap_err();
    let ApiError::Validation(errors) = err else {
        panic!("expected a validation error");
    };
    assert!(errors.field_errors().contains_key("email"));
}
