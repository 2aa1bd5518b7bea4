use serde::Serialize;
use thiserror::Error;

use crate::locator::Locator;

pub type Result<T> = std::result::Result<T, InterviewError>;

/// Error taxonomy for the interview engine.
///
/// `Undefined` is the only variant the runner catches and converts into a
/// question; everything else propagates to the HTTP boundary.
#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    #[error("undefined variable: {0}")]
    Undefined(Locator),

    #[error("invalid input: {} error(s)", .0.len())]
    InvalidInput(Vec<InputError>),

    #[error("interview error: {0}")]
    Misconfigured(String),

    #[error("interview state is not valid: {0}")]
    InvalidState(String),

    #[error("hook failed: {0}")]
    Hook(String),
}

impl InterviewError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidLocator(_) => 400,
            // never surfaces from the runner; reaching the boundary means a bug
            Self::Undefined(_) => 500,
            Self::InvalidInput(_) => 422,
            Self::Misconfigured(_) => 500,
            Self::InvalidState(_) => 400,
            Self::Hook(_) => 502,
        }
    }
}

/// One field-level validation failure, reported in 422 bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputError {
    /// The positional field name (`field_0`, `field_1`, …).
    pub loc: String,
    pub msg: String,
}
