//! HTTP error-mapping tests.
//!
//! These run without a database: validation failures are rejected before
//! any store call, and store calls fail against an unreachable pool.
//!
//! Run with: `cargo test --test api_test`

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::{body_to_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::unreachable();

    let response = app.send(Method::GET, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["platform"], false);
}

#[tokio::test]
async fn test_set_rank_out_of_scale_is_rejected() {
    let app = TestApp::unreachable();

    for rank in [0, 6, 9, -1] {
        let response = app
            .send_json(
                Method::PUT,
                "/api/communities/-100/members/7/rank",
                json!({ "rank": rank }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "rank {rank}");
        let body = body_to_json(response).await;
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_restriction_check_fails_closed() {
    let app = TestApp::unreachable();

    let response = app
        .send(Method::GET, "/api/communities/-100/restrictions/ban/7")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response).await;
    assert_eq!(body["restricted"], true);
    assert_eq!(body["state"], "unavailable");
}

#[tokio::test]
async fn test_store_outage_returns_generic_unavailable() {
    let app = TestApp::unreachable();

    let response = app
        .send_json(
            Method::POST,
            "/api/communities/-100/members/7/warnings",
            json!({ "reason": "flood" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_to_json(response).await;
    assert_eq!(body["error"], "Service temporarily unavailable, try again");
}

#[tokio::test]
async fn test_unknown_restriction_kind_is_rejected() {
    let app = TestApp::unreachable();

    let response = app
        .send(Method::GET, "/api/communities/-100/restrictions/kick/7")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_action_is_rejected() {
    let app = TestApp::unreachable();

    let response = app
        .send_json(
            Method::PUT,
            "/api/communities/-100/permissions/kick",
            json!({ "min_rank": 3 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response).await;
    assert_eq!(body["error"], "Unknown action: kick");

    // Without a default, an unknown action cannot be resolved either.
    let response = app
        .send(Method::GET, "/api/communities/-100/permissions/kick")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_past_expiry_is_rejected() {
    let app = TestApp::unreachable();

    let response = app
        .send_json(
            Method::PUT,
            "/api/communities/-100/restrictions/mute/7",
            json!({ "until": "2001-01-01T00:00:00Z" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response).await;
    assert_eq!(body["error"], "Expiry must be in the future");
}

#[tokio::test]
async fn test_self_action_is_allowed_without_store() {
    let app = TestApp::unreachable();

    let response = app
        .send(
            Method::GET,
            "/api/communities/-100/hierarchy?actor=7&target=7",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response).await;
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn test_action_check_rejects_unknown_action() {
    let app = TestApp::unreachable();

    let response = app
        .send(Method::GET, "/api/communities/-100/permissions/kick/check?actor=7")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response).await;
    assert_eq!(body["error"], "Unknown action: kick");
}

#[tokio::test]
async fn test_action_check_fails_with_store_down() {
    let app = TestApp::unreachable();

    let response = app
        .send(Method::GET, "/api/communities/-100/permissions/ban/check?actor=7")
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_grant_check_rejects_out_of_scale_rank() {
    let app = TestApp::unreachable();

    let response = app
        .send(
            Method::GET,
            "/api/communities/-100/hierarchy?actor=7&target=8&rank=9",
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_module_id_is_rejected() {
    let app = TestApp::unreachable();

    let response = app
        .send_json(
            Method::PUT,
            "/api/communities/-100/modules/Anti-Spam",
            json!({ "enabled": false }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response).await;
    assert_eq!(body["error"], "Invalid module id: Anti-Spam");
}
