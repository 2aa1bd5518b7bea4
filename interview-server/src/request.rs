//! Update/result request parsing.
//!
//! Both endpoints accept JSON (`state` as base85 text) or
//! `multipart/form-data` (`state` as binary, `responses` as JSON text). A
//! binary state part may carry the `metadata\r\n\r\n` prefix of the blob
//! response format; it is stripped if present.

use axum::extract::multipart::Multipart;
use axum::extract::{FromRequest, Request};
use axum::http::header;
use serde::Deserialize;
use serde_json::{Map, Value as Json};

use crate::error::{bad_request, AppError};

/// A parsed update request body.
pub struct UpdateRequest {
    /// The encrypted state blob.
    pub state: Vec<u8>,
    /// The submitted responses, if any.
    pub responses: Option<Map<String, Json>>,
}

#[derive(Debug, Deserialize)]
struct JsonUpdateRequest {
    state: String,
    #[serde(default)]
    responses: Option<Map<String, Json>>,
}

/// Parse a request body into an [`UpdateRequest`].
pub async fn parse_update_request(req: Request) -> Result<UpdateRequest, AppError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        parse_json_request(req).await
    } else if content_type.starts_with("multipart/form-data") {
        parse_multipart_request(req).await
    } else {
        Err(bad_request("unsupported content type"))
    }
}

async fn parse_json_request(req: Request) -> Result<UpdateRequest, AppError> {
    let bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(|_| bad_request("could not read request body"))?;
    let parsed: JsonUpdateRequest =
        serde_json::from_slice(&bytes).map_err(|e| bad_request(format!("invalid body: {e}")))?;
    let state = decode_b85_state(&parsed.state)?;
    Ok(UpdateRequest {
        state,
        responses: parsed.responses,
    })
}

async fn parse_multipart_request(req: Request) -> Result<UpdateRequest, AppError> {
    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|_| bad_request("invalid multipart body"))?;

    let mut state: Option<Vec<u8>> = None;
    let mut responses: Option<Map<String, Json>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| bad_request("invalid multipart body"))?
    {
        match field.name() {
            Some("state") if state.is_none() => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| bad_request("invalid multipart body"))?;
                state = Some(strip_blob_prefix(&bytes).to_vec());
            }
            Some("responses") if responses.is_none() => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| bad_request("invalid multipart body"))?;
                let parsed: Map<String, Json> = serde_json::from_str(&text)
                    .map_err(|e| bad_request(format!("invalid responses: {e}")))?;
                responses = Some(parsed);
            }
            _ => return Err(bad_request("unexpected multipart field")),
        }
    }

    Ok(UpdateRequest {
        state: state.ok_or_else(|| bad_request("missing state"))?,
        responses,
    })
}

/// Decode the base85 text form of the state blob.
pub fn decode_b85_state(text: &str) -> Result<Vec<u8>, AppError> {
    base85::decode(text).map_err(|_| bad_request("invalid state encoding"))
}

/// Drop a `metadata\r\n\r\n` prefix if one is present.
fn strip_blob_prefix(bytes: &[u8]) -> &[u8] {
    const SEP: &[u8] = b"\r\n\r\n";
    bytes
        .windows(SEP.len())
        .position(|window| window == SEP)
        .map(|at| &bytes[at + SEP.len()..])
        .unwrap_or(bytes)
}
