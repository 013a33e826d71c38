//! Integration tests for health, fallback and board route guarding.

mod common;

use serde_json::Value;

#[tokio::test]
async fn health_check() {
    let app = common::spawn_app().await;
    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = common::spawn_app().await;
    let resp = app
        .client
        .get(app.url("/api/no/such/page"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Not found");
}

#[tokio::test]
async fn board_socket_requires_auth() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/api/board/ws?view=analysis"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .get(app.url("/api/board/ws?view=analysis&token=garbage"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}
