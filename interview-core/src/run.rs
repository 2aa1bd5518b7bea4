//! The interview runner: the outer driver for one request.

use std::time::Duration;

use serde_json::{Map, Value as Json};

use crate::error::{InterviewError, Result};
use crate::resolve;
use crate::state::InterviewState;
use crate::step::{handle_steps, AskResult, ResultContent};
use crate::template::TemplateEngine;

/// The default deadline for a single hook request.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Holds the per-process collaborators the step loop needs: the template
/// engine and the pooled hook client. Stateless across requests.
#[derive(Debug)]
pub struct Runner {
    engine: TemplateEngine,
    hook_client: reqwest::Client,
    hook_timeout: Duration,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self::with_hook_timeout(DEFAULT_HOOK_TIMEOUT)
    }

    pub fn with_hook_timeout(hook_timeout: Duration) -> Self {
        Self {
            engine: TemplateEngine::new(),
            // reqwest keeps no cookie store unless asked; hooks must not
            // accumulate cookies across requests
            hook_client: reqwest::Client::new(),
            hook_timeout,
        }
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    pub(crate) fn hook_client(&self) -> &reqwest::Client {
        &self.hook_client
    }

    pub(crate) fn hook_timeout(&self) -> Duration {
        self.hook_timeout
    }

    /// Run the interview logic for one request.
    ///
    /// Applies pending responses if a question is outstanding, then loops
    /// over the steps until content is produced or a pass reports no
    /// change (completion). An undefined variable anywhere in the loop is
    /// resolved to a question and returned as ask content.
    pub async fn run(
        &self,
        state: InterviewState,
        responses: Option<&Map<String, Json>>,
    ) -> Result<(InterviewState, Option<ResultContent>)> {
        let mut state = if state.question_id.is_some() {
            self.apply_responses(state, responses)?
        } else {
            state
        };

        let steps = state.interview.steps.clone();

        loop {
            match handle_steps(self, state.clone(), &steps).await {
                Ok(result) if result.changed => {
                    if result.content.is_some() {
                        return Ok((result.state, result.content));
                    }
                    state = result.state;
                }
                Ok(result) => {
                    // a full pass without changes: the interview is complete
                    return Ok((result.state.set_complete(), None));
                }
                Err(InterviewError::Undefined(loc)) => {
                    tracing::debug!(locator = %loc, "resolving question for undefined variable");
                    let (question_id, schema) = resolve::question_schema_for(self, &state, &loc)?;
                    let state = state.set_question(question_id);
                    return Ok((state, Some(ResultContent::Ask(AskResult { schema }))));
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Validate and apply responses to the outstanding question.
    fn apply_responses(
        &self,
        state: InterviewState,
        responses: Option<&Map<String, Json>>,
    ) -> Result<InterviewState> {
        let Some(question_id) = state.question_id.clone() else {
            return Ok(state);
        };

        let question = state.interview.question(&question_id).ok_or_else(|| {
            InterviewError::Misconfigured(format!("question id not found: {question_id:?}"))
        })?;

        let empty = Map::new();
        let values = question.parse_responses(responses.unwrap_or(&empty))?;

        Ok(state.set_values(values)?.clear_question())
    }
}
