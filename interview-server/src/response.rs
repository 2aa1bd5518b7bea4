//! State response construction: JSON and binary-blob forms.

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use interview_core::{InterviewState, ResultContent};
use serde::Serialize;

use crate::error::AppError;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// The JSON state response body.
#[derive(Debug, Serialize)]
pub struct JsonStateResponse {
    /// The encrypted state, base85-encoded.
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ResultContent>,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

/// The metadata half of the blob response.
#[derive(Debug, Serialize)]
struct BlobResponseData<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a ResultContent>,
    complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    update_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_url: Option<String>,
}

fn update_url(host: &str) -> String {
    format!("http://{host}/update")
}

/// Encrypt `state` and build the response for a start/update request,
/// negotiated by the `Accept` header.
pub fn make_state_response(
    state: &InterviewState,
    content: Option<ResultContent>,
    host: &str,
    key: &[u8; 32],
    accept_octet_stream: bool,
) -> Result<Response, AppError> {
    let encrypted = state.encrypt(key)?;
    let update_url = (!state.complete).then(|| update_url(host));
    let target_url = state.complete.then(|| state.target_url.clone()).flatten();

    if accept_octet_stream {
        let metadata = serde_json::to_vec(&BlobResponseData {
            content: content.as_ref(),
            complete: state.complete,
            update_url,
            target_url,
        })
        .map_err(|e| {
            AppError(interview_core::InterviewError::Misconfigured(format!(
                "response serialization failed: {e}"
            )))
        })?;

        let mut body = metadata;
        body.extend_from_slice(b"\r\n\r\n");
        body.extend_from_slice(&encrypted);

        Ok((
            [(header::CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM))],
            body,
        )
            .into_response())
    } else {
        Ok(Json(JsonStateResponse {
            state: base85::encode(&encrypted),
            content,
            complete: state.complete,
            update_url,
            target_url,
        })
        .into_response())
    }
}
