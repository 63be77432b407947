use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use quorum_access::prelude::*;
use quorum_types::prelude::*;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let store = MemoryAccessStore::new();
    let publisher = MemorySyncPublisher::new();
    let service = Arc::new(AccessService::new(
        store,
        publisher,
        RetryPolicy::default(),
    ));
    router(service)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn missing_grant_renders_public_not_found() {
    let app = app();
    let response = app.oneshot(get("/access/r1/u1")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["code"], "ACCESS.NOT_FOUND");
    // Developer detail never leaks through the public view.
    assert!(body.get("message_dev").is_none());
}

#[tokio::test]
async fn create_then_resolve_roundtrip() {
    let app = app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/access/",
            serde_json::json!({
                "room_id": "r1",
                "user_id": "alice",
                "role": "OWNER",
                "revision": "2-ab"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/access/r1/alice"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["role"], "OWNER");
    assert_eq!(body["revision"], "2-ab");
}

#[tokio::test]
async fn list_by_room_filters_on_role() {
    let app = app();
    for (user, role) in [("alice", "OWNER"), ("bob", "PARTICIPANT")] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/access/",
                serde_json::json!({
                    "room_id": "r1",
                    "user_id": user,
                    "role": role
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get("/access/by-room/r1?role=PARTICIPANT"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(1));
    assert_eq!(body[0]["user_id"], "bob");

    let response = app
        .oneshot(get("/access/by-room/r1?role=WIZARD"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn participant_limit_maps_to_forbidden() {
    let app = app();
    for user in ["u1", "u2"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/access/?participant_limit=2",
                serde_json::json!({
                    "room_id": "r1",
                    "user_id": user,
                    "role": "PARTICIPANT"
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(post_json(
            "/access/?participant_limit=2",
            serde_json::json!({
                "room_id": "r1",
                "user_id": "u3",
                "role": "PARTICIPANT"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["code"], "ACCESS.CAPACITY_EXCEEDED");
}

#[tokio::test]
async fn request_sync_reports_in_flight_tracker() {
    let app = app();
    let response = app
        .oneshot(post_json(
            "/access/sync/r1/5-abc",
            serde_json::json!(null),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["room_id"], "r1");
    assert_eq!(body["revision"], Revision::zero().0);
}

#[tokio::test]
async fn delete_endpoints_remove_grants() {
    let app = app();
    for user in ["alice", "bob"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/access/",
                serde_json::json!({
                    "room_id": "r1",
                    "user_id": user,
                    "role": "PARTICIPANT"
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(delete("/access/r1/alice"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(delete("/access/r1"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(1));

    let response = app
        .oneshot(get("/access/by-user/bob"))
        .await
        .expect("response");
    let body = json_body(response).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(0));
}
