//! Web API Command Tests
//!
//! Integration tests for the command endpoint used by the chat bridge.

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;
use forwarder::web::handlers::AppState;
use forwarder::web::router::create_router;
use forwarder::Database;
use serde_json::{json, Value};

const API_TOKEN: &str = "bridge-secret";

/// Create a test server with an in-memory database.
async fn create_test_server(api_token: &str) -> (TestServer, Arc<Database>) {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let shared_db = Arc::new(db);

    let app_state = Arc::new(AppState::new(shared_db.clone(), ">").with_api_token(api_token));
    let router = create_router(app_state);
    let server = TestServer::new(router).expect("Failed to create test server");

    (server, shared_db)
}

#[tokio::test]
async fn test_health() {
    let (server, _db) = create_test_server(API_TOKEN).await;

    // Health is not behind the token
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_command_requires_token() {
    let (server, _db) = create_test_server(API_TOKEN).await;
    let body = json!({ "user_id": "1", "content": ">alias list" });

    let response = server.post("/api/commands").json(&body).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/api/commands")
        .add_header(AUTHORIZATION, "Bearer wrong")
        .json(&body)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_alias_commands_over_http() {
    let (server, _db) = create_test_server(API_TOKEN).await;
    let auth = format!("Bearer {}", API_TOKEN);

    let response = server
        .post("/api/commands")
        .add_header(AUTHORIZATION, auth.clone())
        .json(&json!({ "user_id": "1", "content": ">alias add b@y.com" }))
        .await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(
        json["data"]["reply"],
        "Successfully added `b@y.com` to your account"
    );

    let response = server
        .post("/api/commands")
        .add_header(AUTHORIZATION, auth.clone())
        .json(&json!({ "user_id": "2", "content": ">alias add b@y.com" }))
        .await;
    let json: Value = response.json();
    assert_eq!(json["data"]["reply"], "The given alias is already taken");

    let response = server
        .post("/api/commands")
        .add_header(AUTHORIZATION, auth)
        .json(&json!({ "user_id": "1", "content": ">alias list" }))
        .await;
    let json: Value = response.json();
    assert_eq!(
        json["data"]["reply"],
        "Current aliases for your account:\n```\n- b@y.com\n```"
    );
}

#[tokio::test]
async fn test_plain_chat_gets_no_reply() {
    let (server, _db) = create_test_server("").await;

    let response = server
        .post("/api/commands")
        .json(&json!({ "user_id": "1", "content": "good morning" }))
        .await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert!(json["data"]["reply"].is_null());
}

#[tokio::test]
async fn test_missing_user_id() {
    let (server, _db) = create_test_server("").await;

    let response = server
        .post("/api/commands")
        .json(&json!({ "user_id": "  ", "content": ">alias list" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_inbox_empty_over_http() {
    let (server, _db) = create_test_server("").await;

    let response = server
        .post("/api/commands")
        .json(&json!({ "user_id": "1", "content": ">email list" }))
        .await;
    let json: Value = response.json();
    assert_eq!(json["data"]["reply"], "Your inbox is empty");
}
