//! Server settings, loaded from `INTERVIEW_*` environment variables with
//! CLI-flag overrides.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context as _};
use interview_core::config::decode_encryption_key;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Address to listen on.
    pub bind: SocketAddr,
    /// Path to the interview bundle file.
    pub interview_config: PathBuf,
    /// The 32-byte state encryption key.
    pub encryption_key: [u8; 32],
    /// The API key compared against bearer tokens.
    pub api_key: String,
    /// Deadline for a single hook request.
    pub hook_timeout: Duration,
}

impl Settings {
    /// Load settings from the environment, honoring `--config <path>` and
    /// `--bind <addr>` CLI overrides.
    pub fn load() -> anyhow::Result<Self> {
        let args: Vec<String> = std::env::args().collect();

        let config_path = flag_value(&args, "--config")
            .or_else(|| std::env::var("INTERVIEW_CONFIG").ok())
            .unwrap_or_else(|| "interviews.yml".to_string());

        let bind = flag_value(&args, "--bind")
            .or_else(|| std::env::var("INTERVIEW_BIND").ok())
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()
            .context("invalid bind address")?;

        let key_text = match std::env::var("INTERVIEW_ENCRYPTION_KEY") {
            Ok(text) => text,
            Err(_) => match std::env::var("INTERVIEW_ENCRYPTION_KEY_FILE") {
                Ok(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("could not read key file {path}"))?,
                Err(_) => bail!(
                    "INTERVIEW_ENCRYPTION_KEY or INTERVIEW_ENCRYPTION_KEY_FILE must be set"
                ),
            },
        };
        let encryption_key = decode_encryption_key(&key_text)?;

        let api_key = std::env::var("INTERVIEW_API_KEY")
            .context("INTERVIEW_API_KEY must be set")?;
        if api_key.is_empty() {
            bail!("INTERVIEW_API_KEY must not be empty");
        }

        let hook_timeout = std::env::var("INTERVIEW_HOOK_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(interview_core::run::DEFAULT_HOOK_TIMEOUT);

        Ok(Self {
            bind,
            interview_config: PathBuf::from(config_path),
            encryption_key,
            api_key,
            hook_timeout,
        })
    }
}

/// Look up `--flag value` in the argument list.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}
