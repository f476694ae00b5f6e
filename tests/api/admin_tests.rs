//! Admin session tests

use axum::http::{header, HeaderValue, StatusCode};
use fake::{faker::lorem::en::Word, Fake};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use chatline::application::services::TokenCodec;
use chatline::presentation::middleware::ADMIN_COOKIE;

use crate::common::{TestApp, ADMIN_SECRET};

#[tokio::test]
async fn test_admin_verify_with_wrong_key_fails() {
    let app = TestApp::new().await;
    let guess: String = Word().fake();

    let response = app
        .server
        .post("/api/v1/admin/verify")
        .json(&json!({ "secretKey": format!("{guess}-wrong") }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid Admin Secret Key");
}

#[tokio::test]
async fn test_admin_session_round_trip() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/v1/admin/verify")
        .json(&json!({ "secretKey": ADMIN_SECRET }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Authenticated Successfully, Welcome BOSS");

    let cookie = response.cookie(ADMIN_COOKIE);
    assert_eq!(cookie.http_only(), Some(true));
    assert!(!cookie.value().is_empty());

    let check = app.server.get("/api/v1/admin").add_cookie(cookie).await;

    check.assert_status_ok();
    let body: Value = check.json();
    assert_eq!(body["admin"], true);
}

#[tokio::test]
async fn test_admin_routes_reject_missing_session() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/v1/admin/stats").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Only Admin can access this route");
}

#[tokio::test]
async fn test_user_session_is_not_admin_session() {
    let app = TestApp::new().await;
    let token = TokenCodec::new(&app.settings.jwt).issue_user(42).unwrap();

    let response = app
        .server
        .get("/api/v1/admin/users")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}
