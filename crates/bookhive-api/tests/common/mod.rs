//! Shared test utilities for bookhive API tests.

// Each test file compiles this module separately and uses a different subset.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookhive_api::http::{create_router, AppState};
use bookhive_server::{PasswordHasher, TokenIssuer};
use bookhive_storage::MemoryDataStore;

/// Lowest bcrypt cost, to keep signups fast.
pub const TEST_BCRYPT_COST: u32 = 4;

pub const TEST_PASSWORD: &str = "correct-horse";

pub fn test_state(storage: Arc<MemoryDataStore>) -> AppState<MemoryDataStore> {
    let tokens = TokenIssuer::new(b"integration-test-secret", 3600).unwrap();
    AppState::new(storage, tokens, PasswordHasher::new(TEST_BCRYPT_COST))
}

/// Router over a fresh in-memory store, plus the store for direct checks.
pub fn test_app() -> (Router, Arc<MemoryDataStore>) {
    let storage = MemoryDataStore::new_shared();
    (create_router(test_state(Arc::clone(&storage))), storage)
}

/// Sends a request and returns status plus parsed JSON (Null when empty).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// A signed-up account.
pub struct TestAccount {
    pub id: String,
    pub token: String,
}

pub async fn signup(app: &Router, name: &str, email: &str, role: &str) -> TestAccount {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "name": name, "email": email, "password": TEST_PASSWORD, "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    TestAccount {
        id: body["user"]["id"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

pub async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Creates a book authored by `author` through the general create route.
pub async fn create_book(app: &Router, author: &TestAccount, title: &str, price: f64) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/books",
        Some(&author.token),
        Some(json!({ "title": title, "price": price, "author": author.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create book failed: {body}");
    body["book"].clone()
}

pub fn id_of(doc: &Value) -> String {
    doc["_id"].as_str().unwrap().to_string()
}
