//! Integration tests for the LED controller HTTP API

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use deltawash::core::{create_router, ControllerState, MemoryLeds};
use serde_json::{json, Value};
use tower::ServiceExt;

fn create_test_app() -> (Router, Arc<ControllerState>) {
    let state = ControllerState::new(MemoryLeds::new());
    (create_router(state.clone()), state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_signal(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/signal")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn health(app: &Router) -> Value {
    let (status, json) = send(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json
}

#[tokio::test]
async fn test_health_starts_dark() {
    let (app, _) = create_test_app();
    let json = health(&app).await;

    assert_eq!(json["ok"], true);
    assert_eq!(json["current"], Value::Null);
    assert_eq!(json["completed"], json!([]));
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_valid_signal_acknowledged() {
    let (app, state) = create_test_app();
    let (status, json) = send(&app, post_signal(r#"{"step": 4, "state": "CURRENT"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"ok": true}));
    assert_eq!(health(&app).await["current"], 4);
    assert_eq!(state.health().await.current.map(|s| s.number()), Some(4));
}

#[tokio::test]
async fn test_extra_keys_ignored() {
    let (app, _) = create_test_app();
    let (status, _) = send(
        &app,
        post_signal(r#"{"step": 2, "state": "COMPLETED", "source": "interpreter"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health(&app).await["completed"], json!([2]));
}

#[tokio::test]
async fn test_out_of_range_steps_rejected_without_side_effects() {
    let (app, _) = create_test_app();
    let before = health(&app).await;

    for step in [0, 1, 8, 9, -3] {
        let body = json!({"step": step, "state": "COMPLETED"}).to_string();
        let (status, json) = send(&app, post_signal(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "step {}", step);
        assert_eq!(json["ok"], false);
        assert!(json["error"].is_string());
    }

    let after = health(&app).await;
    assert_eq!(before["current"], after["current"]);
    assert_eq!(before["completed"], after["completed"]);
}

#[tokio::test]
async fn test_malformed_bodies_rejected() {
    let (app, _) = create_test_app();
    let bodies = [
        "",
        "not json",
        "[2, \"CURRENT\"]",
        r#"{"state": "CURRENT"}"#,
        r#"{"step": 3}"#,
        r#"{"step": "3", "state": "CURRENT"}"#,
        r#"{"step": 3.5, "state": "CURRENT"}"#,
        r#"{"step": 3, "state": "BLINKING"}"#,
        r#"{"step": 3, "state": "current"}"#,
        r#"{"step": 3, "state": 1}"#,
    ];

    for body in bodies {
        let (status, json) = send(&app, post_signal(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(json["ok"], false);
    }
    assert_eq!(health(&app).await["current"], Value::Null);
}

#[tokio::test]
async fn test_wrong_method_rejected() {
    let (app, _) = create_test_app();
    let (status, _) = send(
        &app,
        Request::builder().uri("/signal").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send(
        &app,
        Request::builder().uri("/status").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_latch_survives_idle_and_current() {
    let (app, _) = create_test_app();
    send(&app, post_signal(r#"{"step": 6, "state": "COMPLETED"}"#)).await;
    send(&app, post_signal(r#"{"step": 6, "state": "IDLE"}"#)).await;
    let (status, _) = send(&app, post_signal(r#"{"step": 6, "state": "CURRENT"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    let json = health(&app).await;
    assert_eq!(json["completed"], json!([6]));
    assert_eq!(json["current"], Value::Null);
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let (app, _) = create_test_app();
    send(&app, post_signal(r#"{"step": 3, "state": "COMPLETED"}"#)).await;
    send(&app, post_signal(r#"{"step": 5, "state": "CURRENT"}"#)).await;

    let (status, json) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/reset")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"ok": true}));

    let json = health(&app).await;
    assert_eq!(json["current"], Value::Null);
    assert_eq!(json["completed"], json!([]));
    assert_eq!(json["lit"], json!([]));
}

#[tokio::test]
async fn test_duplicate_current_is_idempotent() {
    let (app, _) = create_test_app();
    for _ in 0..5 {
        let (status, _) = send(&app, post_signal(r#"{"step": 7, "state": "CURRENT"}"#)).await;
        assert_eq!(status, StatusCode::OK);
    }
    send(&app, post_signal(r#"{"step": 2, "state": "CURRENT"}"#)).await;

    let json = health(&app).await;
    assert_eq!(json["current"], 2);
    assert_eq!(json["completed"], json!([]));
}
