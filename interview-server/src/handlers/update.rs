//! Update handler: one step of an interview against a client-held state.

use axum::extract::{Host, Request};
use axum::response::Response;
use axum::Extension;
use interview_core::InterviewState;

use crate::error::{bad_request, AppError};
use crate::handlers::wants_octet_stream;
use crate::request::parse_update_request;
use crate::response::make_state_response;
use crate::SharedState;

/// POST /update — no bearer auth; the encrypted state authenticates itself.
pub async fn update(
    Extension(state): Extension<SharedState>,
    host: Option<Host>,
    req: Request,
) -> Result<Response, AppError> {
    let host = host.map(|Host(h)| h).unwrap_or_else(|| "localhost".into());
    let accept_octet_stream = wants_octet_stream(req.headers());
    let parsed = parse_update_request(req).await?;

    let interview_state = InterviewState::decrypt(&parsed.state, &state.encryption_key)
        .and_then(|s| {
            s.validate()?;
            Ok(s)
        })
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected state");
            bad_request("interview state is not valid")
        })?;

    let (updated, content) = state
        .runner
        .run(interview_state, parsed.responses.as_ref())
        .await?;

    make_state_response(
        &updated,
        content,
        &host,
        &state.encryption_key,
        accept_octet_stream,
    )
}
