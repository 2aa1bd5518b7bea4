//! Interview steps and the step executor.
//!
//! Steps run in declared order; the first step whose `when` is truthy and
//! which reports a change terminates the pass. Only the hook step suspends.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{InterviewError, Result};
use crate::locator::Locator;
use crate::logic::Conditions;
use crate::run::Runner;
use crate::state::InterviewState;
use crate::template::{Expression, Template};

/// A result asking a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResult {
    pub schema: Json,
}

/// An exit result. Terminal content, but the state is not marked complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitResult {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Content produced by a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResultContent {
    #[serde(rename = "question")]
    Ask(AskResult),
    #[serde(rename = "exit")]
    Exit(ExitResult),
}

/// The result of a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// The updated state.
    pub state: InterviewState,
    /// Whether a change was made.
    pub changed: bool,
    /// Result content, if any.
    pub content: Option<ResultContent>,
}

impl StepResult {
    fn unchanged(state: InterviewState) -> Self {
        Self {
            state,
            changed: false,
            content: None,
        }
    }
}

/// One unit of the interview program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Ask(AskStep),
    Set(SetStep),
    Eval(EvalStep),
    Exit(ExitStep),
    Block(BlockStep),
    Hook(HookStep),
}

impl Step {
    pub fn when(&self) -> &Conditions {
        match self {
            Step::Ask(s) => &s.when,
            Step::Set(s) => &s.when,
            Step::Eval(s) => &s.when,
            Step::Exit(s) => &s.when,
            Step::Block(s) => &s.when,
            Step::Hook(s) => &s.when,
        }
    }
}

/// Ask a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskStep {
    /// The question ID.
    pub ask: String,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub when: Conditions,
}

impl AskStep {
    fn handle(&self, runner: &Runner, state: InterviewState) -> Result<StepResult> {
        // skip if the question was already asked
        if state.answered_question_ids.contains(&self.ask) {
            return Ok(StepResult::unchanged(state));
        }

        let question = state.interview.question(&self.ask).ok_or_else(|| {
            InterviewError::Misconfigured(format!("question id not found: {:?}", self.ask))
        })?;
        let schema = question.schema(runner.engine(), &state.template_context())?;

        Ok(StepResult {
            state: state.set_question(self.ask.clone()),
            changed: true,
            content: Some(ResultContent::Ask(AskResult { schema })),
        })
    }
}

/// Set a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetStep {
    /// The variable to set.
    pub set: Locator,

    /// The value to set.
    pub value: Expression,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub when: Conditions,
}

impl SetStep {
    fn handle(&self, runner: &Runner, state: InterviewState) -> Result<StepResult> {
        let ctx = state.template_context();

        let current = match self.set.evaluate(&ctx) {
            Ok(value) => Some(value),
            Err(InterviewError::Undefined(_)) => None,
            Err(other) => return Err(other),
        };

        let value = runner.engine().evaluate(&self.value, &ctx)?;

        if current.as_ref() == Some(&value) {
            return Ok(StepResult::unchanged(state));
        }

        let mut data = state.data.clone();
        self.set.set(value, &mut data).map_err(|e| match e {
            InterviewError::Undefined(missing) => InterviewError::Misconfigured(format!(
                "undefined variable {missing} when setting {}; \
                 collections are not automatically created",
                self.set
            )),
            other => other,
        })?;

        Ok(StepResult {
            state: state.set_data(data),
            changed: true,
            content: None,
        })
    }
}

/// Ensure values are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalStep {
    /// The value or values to evaluate.
    pub eval: Conditions,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub when: Conditions,
}

impl EvalStep {
    fn handle(&self, runner: &Runner, state: InterviewState) -> Result<StepResult> {
        self.eval.force(runner.engine(), &state.template_context())?;
        Ok(StepResult::unchanged(state))
    }
}

/// Stop the interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitStep {
    /// The reason.
    pub exit: Template,

    /// An optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Template>,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub when: Conditions,
}

impl ExitStep {
    fn handle(&self, runner: &Runner, state: InterviewState) -> Result<StepResult> {
        let ctx = state.template_context();
        let title = runner.engine().render(&self.exit, &ctx)?;
        let description = match &self.description {
            Some(template) => Some(runner.engine().render(template, &ctx)?),
            None => None,
        };
        Ok(StepResult {
            state,
            changed: true,
            content: Some(ResultContent::Exit(ExitResult { title, description })),
        })
    }
}

/// A nested group of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStep {
    pub block: Vec<Step>,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub when: Conditions,
}

/// POST the state to a webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookStep {
    pub url: String,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub when: Conditions,
}

#[derive(Debug, Deserialize)]
struct HookResponse {
    state: InterviewState,
    #[serde(default)]
    content: Option<ResultContent>,
}

impl HookStep {
    async fn handle(&self, runner: &Runner, state: InterviewState) -> Result<StepResult> {
        tracing::debug!(url = %self.url, "posting state to hook");
        let response = runner
            .hook_client()
            .post(&self.url)
            .timeout(runner.hook_timeout())
            .json(&state)
            .send()
            .await
            .map_err(|e| InterviewError::Hook(format!("request to {} failed: {e}", self.url)))?;

        match response.status().as_u16() {
            204 => Ok(StepResult::unchanged(state)),
            200 => {
                let body: HookResponse = response.json().await.map_err(|e| {
                    InterviewError::Hook(format!("invalid response body from {}: {e}", self.url))
                })?;
                Ok(StepResult {
                    state: body.state,
                    changed: true,
                    content: body.content,
                })
            }
            status => Err(InterviewError::Hook(format!(
                "{} returned status {status}",
                self.url
            ))),
        }
    }
}

type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<StepResult>> + Send + 'a>>;

/// Run one pass over `steps`. The first step whose guard is truthy and
/// which reports a change ends the pass; guard failures are skipped
/// silently, but an undefined variable inside a guard propagates.
pub fn handle_steps<'a>(
    runner: &'a Runner,
    state: InterviewState,
    steps: &'a [Step],
) -> StepFuture<'a> {
    Box::pin(async move {
        let mut state = state;
        for step in steps {
            if !step.when().evaluate(runner.engine(), &state.template_context())? {
                continue;
            }
            let result = match step {
                Step::Ask(s) => s.handle(runner, state)?,
                Step::Set(s) => s.handle(runner, state)?,
                Step::Eval(s) => s.handle(runner, state)?,
                Step::Exit(s) => s.handle(runner, state)?,
                Step::Block(s) => handle_steps(runner, state, &s.block).await?,
                Step::Hook(s) => s.handle(runner, state).await?,
            };
            if result.changed {
                return Ok(result);
            }
            state = result.state;
        }
        Ok(StepResult::unchanged(state))
    })
}
