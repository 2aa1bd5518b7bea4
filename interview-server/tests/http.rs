//! HTTP-level integration tests for the interview server: bearer auth,
//! content negotiation, and the start → update → result flow.

use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{header, Request, StatusCode};
use interview_core::{Interview, InterviewConfig, Runner};
use interview_server::router::build_router;
use interview_server::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "changeit";
const KEY: [u8; 32] = [0u8; 32];

fn test_interviews() -> Vec<Interview> {
    serde_yaml::from_str(
        "
- id: int1
  title: Simple
  questions:
    - id: q1
      title: Name
      fields:
        - type: text
          set: name
          label: Name
  steps:
    - ask: q1
    - set: name2
      value: name
",
    )
    .unwrap()
}

fn build_test_app() -> axum::Router {
    let interviews = InterviewConfig::from_interviews(test_interviews()).unwrap();
    build_router(Arc::new(AppState {
        interviews,
        runner: Runner::new(),
        encryption_key: KEY,
        api_key: API_KEY.to_string(),
    }))
}

fn authed(builder: hyper::http::request::Builder) -> hyper::http::request::Builder {
    builder.header(header::AUTHORIZATION, format!("Bearer {API_KEY}"))
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(
        |_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }),
    )
}

async fn start(app: &axum::Router, id: &str, body: Value) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            authed(Request::builder().method("POST").uri(format!("/interviews/{id}")))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    (resp.status(), body_json(resp).await)
}

async fn update(app: &axum::Router, state: &str, responses: Value) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/update")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"state": state, "responses": responses}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    (resp.status(), body_json(resp).await)
}

async fn result(app: &axum::Router, state: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            authed(Request::builder().method("POST").uri("/result"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"state": state}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    (resp.status(), body_json(resp).await)
}

// ── Auth ────────────────────────────────────────────────────────

#[tokio::test]
async fn list_requires_bearer_auth() {
    let app = build_test_app();

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/interviews").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/interviews")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(
            authed(Request::builder().uri("/interviews"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn list_and_get_interviews() {
    let app = build_test_app();

    let resp = app
        .clone()
        .oneshot(
            authed(Request::builder().uri("/interviews"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listing = body_json(resp).await;
    assert_eq!(listing, json!([{"id": "int1", "title": "Simple"}]));

    let resp = app
        .clone()
        .oneshot(
            authed(Request::builder().uri("/interviews/int1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let config = body_json(resp).await;
    assert_eq!(config["id"], json!("int1"));

    let resp = app
        .oneshot(
            authed(Request::builder().uri("/interviews/unknown"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Full flow ───────────────────────────────────────────────────

#[tokio::test]
async fn start_update_result_flow() {
    let app = build_test_app();

    let (status, body) = start(&app, "int1", json!({"context": {}, "data": {}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["type"], json!("question"));
    assert_eq!(
        body["content"]["schema"],
        json!({
            "type": "object",
            "title": "Name",
            "properties": {
                "field_0": {
                    "type": "string",
                    "x-type": "text",
                    "minLength": 0,
                    "maxLength": 300,
                    "nullable": false,
                    "title": "Name",
                }
            },
            "required": ["field_0"],
        })
    );
    assert_eq!(body["complete"], json!(false));
    assert!(body["update_url"].as_str().unwrap().ends_with("/update"));
    let state = body["state"].as_str().unwrap();

    let (status, body) = update(&app, state, json!({"field_0": "Test"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complete"], json!(true));
    assert!(body.get("content").is_none());
    let state = body["state"].as_str().unwrap();

    let (status, body) = result(&app, state).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"name": "Test", "name2": "Test"}));
    assert_eq!(body["complete"], json!(true));
}

#[tokio::test]
async fn start_unknown_interview_is_404() {
    let app = build_test_app();
    let (status, _) = start(&app, "nope", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_responses_are_422_with_details() {
    let app = build_test_app();
    let (_, body) = start(&app, "int1", json!({})).await;
    let state = body["state"].as_str().unwrap();

    let (status, body) = update(&app, state, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["loc"], json!("field_0"));
    assert!(body["errors"][0]["msg"].is_string());
}

#[tokio::test]
async fn tampered_state_is_400() {
    let app = build_test_app();
    let (_, body) = start(&app, "int1", json!({})).await;
    let state = body["state"].as_str().unwrap();

    let mut blob = base85::decode(state).unwrap();
    blob[128] = blob[128].wrapping_add(1);
    let tampered = base85::encode(&blob);

    let (status, _) = update(&app, &tampered, json!({"field_0": "Test"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn result_requires_a_complete_state() {
    let app = build_test_app();
    let (_, body) = start(&app, "int1", json!({})).await;
    let state = body["state"].as_str().unwrap();

    let (status, _) = result(&app, state).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Content negotiation and multipart ───────────────────────────

fn split_blob(bytes: &[u8]) -> (Value, Vec<u8>) {
    let sep = b"\r\n\r\n";
    let at = bytes
        .windows(sep.len())
        .position(|w| w == sep)
        .expect("blob separator present");
    let metadata = serde_json::from_slice(&bytes[..at]).unwrap();
    (metadata, bytes[at + sep.len()..].to_vec())
}

#[tokio::test]
async fn octet_stream_negotiation_and_multipart_update() {
    let app = build_test_app();

    let resp = app
        .clone()
        .oneshot(
            authed(Request::builder().method("POST").uri("/interviews/int1"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "application/octet-stream")
                .body(Body::from(json!({}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let (metadata, state_blob) = split_blob(&bytes);
    assert_eq!(metadata["content"]["type"], json!("question"));
    assert_eq!(metadata["complete"], json!(false));

    // round-trip the binary state through a multipart update
    let boundary = "test-boundary-7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"state\"\r\n\
          Content-Type: application/octet-stream\r\n\r\n",
    );
    body.extend_from_slice(&state_blob);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"responses\"\r\n\r\n");
    body.extend_from_slice(json!({"field_0": "Test"}).to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/update")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["complete"], json!(true));
}
