//! Session enforcement tests

use axum::http::{header, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

use crate::common::TestApp;

#[test_case("/api/v1/user/me" ; "profile")]
#[test_case("/api/v1/user/notifications" ; "notifications")]
#[test_case("/api/v1/user/logout" ; "logout")]
#[test_case("/api/v1/chat/my" ; "chat list")]
#[test_case("/api/v1/chat/123" ; "chat details")]
#[tokio::test]
async fn test_protected_route_requires_session(path: &str) {
    let app = TestApp::new().await;

    let response = app.server.get(path).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Please login to access this route");
}

#[tokio::test]
async fn test_forged_bearer_token_rejected() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/api/v1/user/me")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer not-a-real-token"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_socket_requires_session() {
    let app = TestApp::new().await;

    let response = app.server.get("/socket").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_missing_fields_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/v1/user/login")
        .json(&json!({ "username": "" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}
