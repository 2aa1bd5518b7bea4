//! Result handler: the contents of a completed state.

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use interview_core::{Context, Interview, InterviewState};
use serde::Serialize;

use crate::error::{bad_request, AppError};
use crate::request::parse_update_request;
use crate::SharedState;

#[derive(Debug, Serialize)]
pub struct InterviewResultResponse {
    pub interview: Interview,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    pub submission_id: String,
    pub expiration_date: DateTime<Utc>,
    pub complete: bool,
    pub context: Context,
    pub data: Context,
}

/// POST /result — bearer-authenticated retrieval of a completed state.
pub async fn result(
    Extension(state): Extension<SharedState>,
    req: Request,
) -> Result<Response, AppError> {
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

    if !interview_state.complete {
        tracing::debug!("rejected state: interview is not complete");
        return Err(bad_request("interview is not complete"));
    }

    Ok(Json(InterviewResultResponse {
        interview: interview_state.interview,
        target_url: interview_state.target_url,
        submission_id: interview_state.submission_id,
        expiration_date: interview_state.expiration_date,
        complete: interview_state.complete,
        context: interview_state.context,
        data: interview_state.data,
    })
    .into_response())
}
