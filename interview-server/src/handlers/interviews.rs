//! Interview listing, config, and start handlers.

use axum::extract::{Host, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use interview_core::{Context, InterviewState};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::wants_octet_stream;
use crate::response::make_state_response;
use crate::SharedState;

#[derive(Debug, Serialize)]
pub struct InterviewListItem {
    pub id: String,
    pub title: Option<String>,
}

/// GET /interviews — list configured interviews.
pub async fn list_interviews(Extension(state): Extension<SharedState>) -> Json<Vec<InterviewListItem>> {
    Json(
        state
            .interviews
            .iter()
            .map(|(id, interview)| InterviewListItem {
                id: id.to_string(),
                title: interview.title.clone(),
            })
            .collect(),
    )
}

/// GET /interviews/{id} — the interview configuration.
pub async fn get_interview(
    Extension(state): Extension<SharedState>,
    Path(interview_id): Path<String>,
) -> Response {
    match state.interviews.get(&interview_id) {
        Some(interview) => Json(interview).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StartInterviewRequest {
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub submission_id: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub data: Context,
}

/// POST /interviews/{id} — start an interview and run it to first content.
pub async fn start_interview(
    Extension(state): Extension<SharedState>,
    Path(interview_id): Path<String>,
    host: Option<Host>,
    headers: HeaderMap,
    body: Option<Json<StartInterviewRequest>>,
) -> Result<Response, AppError> {
    let host = host.map(|Host(h)| h).unwrap_or_else(|| "localhost".into());
    let Some(interview) = state.interviews.get(&interview_id) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let Json(request) = body.unwrap_or_default();

    let initial = InterviewState::new(interview.clone())
        .with_target_url(request.target_url)
        .with_submission_id(request.submission_id)
        .with_expiration_date(request.expiration_date)
        .with_context(request.context)
        .with_data(request.data);

    let (updated, content) = state.runner.run(initial, None).await?;

    make_state_response(
        &updated,
        content,
        &host,
        &state.encryption_key,
        wants_octet_stream(&headers),
    )
}
