//! Hook step round-trip against a live listener.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use interview_core::{Interview, InterviewError, InterviewState, Runner};
use serde_json::{json, Value};

#[derive(Default)]
struct HookTarget {
    calls: AtomicUsize,
}

/// First call: return the state with `data.modified` set. Later calls: 204.
async fn hook(State(target): State<Arc<HookTarget>>, Json(mut state): Json<Value>) -> Response {
    let call = target.calls.fetch_add(1, Ordering::SeqCst);
    if call == 0 {
        state["data"]["modified"] = json!(true);
        Json(json!({ "state": state })).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn failing_hook() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_hook_server() -> (SocketAddr, Arc<HookTarget>) {
    let target = Arc::new(HookTarget::default());
    let router = Router::new()
        .route("/hook", post(hook))
        .route("/broken", post(failing_hook))
        .with_state(target.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, target)
}

fn hook_interview(url: String) -> Interview {
    serde_yaml::from_str(&format!(
        "
id: hooked
steps:
  - url: {url}
"
    ))
    .unwrap()
}

#[tokio::test]
async fn hook_modifies_state_then_interview_completes() {
    let (addr, target) = spawn_hook_server().await;
    let runner = Runner::new();

    let state = InterviewState::new(hook_interview(format!("http://{addr}/hook")));
    assert!(!state.data.contains_key("modified"));

    let (state, content) = runner.run(state, None).await.unwrap();
    assert!(content.is_none());
    assert!(state.complete);
    assert_eq!(state.data["modified"], json!(true));
    // one 200 with a modified state, then a 204
    assert_eq!(target.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failing_hook_surfaces_as_hook_error() {
    let (addr, _) = spawn_hook_server().await;
    let runner = Runner::new();

    let state = InterviewState::new(hook_interview(format!("http://{addr}/broken")));
    let err = runner.run(state, None).await.unwrap_err();
    assert!(matches!(err, InterviewError::Hook(_)));
}

#[tokio::test]
async fn unreachable_hook_surfaces_as_hook_error() {
    let runner = Runner::new();
    // nothing listens on this port
    let state = InterviewState::new(hook_interview("http://127.0.0.1:9/hook".into()));
    let err = runner.run(state, None).await.unwrap_err();
    assert!(matches!(err, InterviewError::Hook(_)));
}
