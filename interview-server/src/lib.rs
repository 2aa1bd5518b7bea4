//! Interview engine REST server.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod request;
pub mod response;
pub mod router;
pub mod settings;

use std::sync::Arc;

use interview_core::{InterviewConfig, Runner};

/// Shared, read-only application state.
pub struct AppState {
    pub interviews: InterviewConfig,
    pub runner: Runner,
    pub encryption_key: [u8; 32],
    pub api_key: String,
}

pub type SharedState = Arc<AppState>;
