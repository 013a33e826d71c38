//! Integration tests for auth endpoints.

mod common;

use common::TestApp;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn register_user(app: &TestApp, username: &str, email: &str, password: &str) -> reqwest::Response {
    app.client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
        }))
        .send()
        .await
        .expect("Failed to send register request")
}

async fn login_user(app: &TestApp, email: &str, password: &str) -> reqwest::Response {
    app.client
        .post(app.url("/api/auth/login"))
        .json(&json!({
            "email": email,
            "password": password,
        }))
        .send()
        .await
        .expect("Failed to send login request")
}

async fn get_me(app: &TestApp, token: &str) -> reqwest::Response {
    app.client
        .get(app.url("/api/auth/me"))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send me request")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Full auth flow: register, login, me.
#[tokio::test]
async fn register_login_and_me() {
    let app = common::spawn_app().await;

    let resp = register_user(&app, "reviewer", "reviewer@example.com", "testpass123").await;
    assert_eq!(resp.status(), 200, "Register should succeed");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["username"], "reviewer");
    assert_eq!(body["user"]["email"], "reviewer@example.com");
    assert!(body["token"].is_string(), "Should return a JWT token");

    let resp = login_user(&app, "reviewer@example.com", "testpass123").await;
    assert_eq!(resp.status(), 200, "Login should succeed");

    let body: Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let resp = get_me(&app, &token).await;
    assert_eq!(resp.status(), 200, "GET /me should succeed with valid token");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["username"], "reviewer");
    assert_eq!(body["displayName"], "reviewer");
}

#[tokio::test]
async fn register_duplicate_email_fails() {
    let app = common::spawn_app().await;

    let resp = register_user(&app, "dup_a", "dup@example.com", "testpass123").await;
    assert_eq!(resp.status(), 200);

    let resp = register_user(&app, "dup_b", "dup@example.com", "testpass123").await;
    assert_eq!(resp.status(), 400, "Duplicate email should be rejected");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Email already registered");
}

#[tokio::test]
async fn register_duplicate_username_fails() {
    let app = common::spawn_app().await;

    let resp = register_user(&app, "dupuser", "first@example.com", "testpass123").await;
    assert_eq!(resp.status(), 200);

    let resp = register_user(&app, "dupuser", "second@example.com", "testpass123").await;
    assert_eq!(resp.status(), 400, "Duplicate username should be rejected");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Username already taken");
}

#[tokio::test]
async fn login_wrong_password_fails() {
    let app = common::spawn_app().await;
    register_user(&app, "wrongpw", "wrongpw@example.com", "correctpass1").await;

    let resp = login_user(&app, "wrongpw@example.com", "wrongpassword").await;
    assert_eq!(resp.status(), 400, "Wrong password should be rejected");
}

#[tokio::test]
async fn login_nonexistent_email_fails() {
    let app = common::spawn_app().await;
    let resp = login_user(&app, "nobody@example.com", "whatever123").await;
    assert_eq!(resp.status(), 400, "Nonexistent email should be rejected");
}

#[tokio::test]
async fn me_without_token_fails() {
    let app = common::spawn_app().await;
    let resp = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), 401, "No token should return 401");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Not authenticated");
}

#[tokio::test]
async fn me_with_invalid_token_fails() {
    let app = common::spawn_app().await;
    let resp = get_me(&app, "this.is.not.a.valid.jwt").await;
    assert_eq!(resp.status(), 401, "Invalid token should return 401");
}

#[tokio::test]
async fn me_accepts_query_token() {
    let app = common::spawn_app().await;
    let token = app.register("querytoken").await;

    let resp = app
        .client
        .get(app.url(&format!("/api/auth/me?token={token}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "Token in query string should be accepted");
}

#[tokio::test]
async fn register_validation() {
    let app = common::spawn_app().await;

    let resp = register_user(&app, "ab", "short@example.com", "testpass123").await;
    assert_eq!(resp.status(), 400, "Username < 3 chars should be rejected");

    let resp = register_user(&app, "shortpw", "shortpw@example.com", "short").await;
    assert_eq!(resp.status(), 400, "Password < 8 chars should be rejected");
}
