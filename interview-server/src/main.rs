use std::sync::Arc;

use interview_core::{InterviewConfig, Runner};
use interview_server::router::build_router;
use interview_server::settings::Settings;
use interview_server::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let settings = Settings::load()?;

    let interviews = InterviewConfig::load(&settings.interview_config)?;
    tracing::info!(
        count = interviews.len(),
        config = %settings.interview_config.display(),
        "loaded interviews"
    );

    let state = Arc::new(AppState {
        interviews,
        runner: Runner::with_hook_timeout(settings.hook_timeout),
        encryption_key: settings.encryption_key,
        api_key: settings.api_key,
    });

    let router = build_router(state);

    tracing::info!("interview server listening on {}", settings.bind);
    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
