//! API integration tests.
//!
//! These drive the control-plane router against an in-memory SQLite store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use peerlink_api::{AppState, router as api_router};
use peerlink_common::IdGenerator;
use peerlink_common::config::{OverflowPolicy, RelayConfig};
use peerlink_core::{ConnectionRegistry, GroupService, RoutingService, SignalingRelay};
use peerlink_db::repositories::{GroupMessageRepository, GroupRepository, MessageRepository};
use sea_orm::{ConnectOptions, Database};
use tower::ServiceExt;

async fn test_app() -> Router {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.expect("connect");
    peerlink_db::migrate(&db).await.expect("migrate");
    let db = Arc::new(db);

    let message_repo = MessageRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let group_message_repo = GroupMessageRepository::new(Arc::clone(&db));

    let registry = ConnectionRegistry::new(64, OverflowPolicy::Drop);
    let routing = RoutingService::new(message_repo, registry.clone());
    let groups = GroupService::new(
        group_repo,
        group_message_repo,
        registry.clone(),
        &RelayConfig::default(),
    );
    let signaling = SignalingRelay::new(registry.clone());

    let state = AppState {
        registry,
        routing,
        groups,
        signaling,
        id_gen: IdGenerator::new(),
    };

    Router::new().nest("/api", api_router()).with_state(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn generate_id_returns_four_characters() {
    let app = test_app().await;

    let response = app.oneshot(get("/api/generate-id")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["id"].as_str().unwrap().len(), 4);
}

#[tokio::test]
async fn status_is_offline_without_a_session() {
    let app = test_app().await;

    let response = app.oneshot(get("/api/status/ZZZZ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["online"], false);
}

#[tokio::test]
async fn message_history_starts_empty() {
    let app = test_app().await;

    let response = app.oneshot(get("/api/messages/AAAA")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn purge_acknowledges_success() {
    let app = test_app().await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/messages/AAAA/BBBB")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"success": true}));
}

#[tokio::test]
async fn group_lifecycle_over_http() {
    let app = test_app().await;

    // Create a group with two extra members.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/groups",
            serde_json::json!({
                "name": "Test Group",
                "createdBy": "AAAA",
                "initialMembers": ["BBBB", "CCCC"],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let group = body_json(response).await;
    let group_id = group["id"].as_str().unwrap().to_owned();
    assert!(group_id.starts_with("GROUP_"));
    assert_eq!(group["memberCount"], 3);
    assert_eq!(group["createdBy"], "AAAA");

    // The creator shows up as admin in the member listing.
    let response = app
        .clone()
        .oneshot(get(&format!("/api/groups/{group_id}/members")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let members = body_json(response).await;
    let creator = members
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["userId"] == "AAAA")
        .unwrap();
    assert_eq!(creator["role"], "admin");
    assert_eq!(creator["isOnline"], false);

    // The group is listed for its members.
    let response = app
        .clone()
        .oneshot(get("/api/users/BBBB/groups"))
        .await
        .unwrap();
    let groups = body_json(response).await;
    assert_eq!(groups.as_array().unwrap().len(), 1);
    assert_eq!(groups[0]["id"], group_id.as_str());

    // Member message fetch is allowed, stranger fetch is not.
    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/groups/{group_id}/messages?userId=BBBB"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/groups/{group_id}/messages?userId=ZZZZ"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Moderation by a non-admin is refused.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/groups/{group_id}/admin"),
            serde_json::json!({
                "type": "mute",
                "targetUserId": "CCCC",
                "performedBy": "BBBB",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Moderation by the admin is applied and echoed.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/groups/{group_id}/admin"),
            serde_json::json!({
                "type": "mute",
                "targetUserId": "CCCC",
                "performedBy": "AAAA",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let action = body_json(response).await;
    assert_eq!(action["type"], "mute");
    assert_eq!(action["targetUserId"], "CCCC");

    // The sole admin cannot leave.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/groups/{group_id}/leave"),
            serde_json::json!({"userId": "AAAA"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert!(error["error"]["message"]
        .as_str()
        .unwrap()
        .contains("only admin"));

    // A regular member can.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/groups/{group_id}/leave"),
            serde_json::json!({"userId": "BBBB"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"success": true}));

    // Adding members through the API returns the updated list.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/groups/{group_id}/members"),
            serde_json::json!({"userIds": ["DDDD"], "addedBy": "AAAA"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let members = body_json(response).await;
    assert!(members
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m["userId"] == "DDDD"));
}

#[tokio::test]
async fn unknown_group_member_listing_is_404() {
    let app = test_app().await;

    let response = app
        .oneshot(get("/api/groups/GROUP_ZZZZZZ/members"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn group_creation_rejects_an_empty_name() {
    let app = test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/groups",
            serde_json::json!({"name": "", "createdBy": "AAAA"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
