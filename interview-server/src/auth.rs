//! Bearer authentication middleware.
//!
//! Compares `Authorization: Bearer <token>` against the configured API key
//! in constant time. Returns 401 on a missing, malformed, or wrong token.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::SharedState;

pub async fn bearer_auth(req: Request, next: Next) -> Result<Response, Response> {
    let state = req
        .extensions()
        .get::<SharedState>()
        .cloned()
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "app state not initialized"})),
            )
                .into_response()
        })?;

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized())?;

    if !bool::from(token.as_bytes().ct_eq(state.api_key.as_bytes())) {
        return Err(unauthorized());
    }

    Ok(next.run(req).await)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized"})),
    )
        .into_response()
}
