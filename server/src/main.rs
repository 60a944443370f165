use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizlink::config::load_settings;
use quizlink::error::Result as AppResult;
use quizlink::quiz::drafting::GeminiDrafter;
use quizlink::state::AppState;
use quizlink::web::run_server;

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,tower_http=debug", env!("CARGO_PKG_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_settings = load_settings()?;
    tracing::info!("Configuration loaded: {:?}", app_settings);

    let drafter = GeminiDrafter::from_config(&app_settings.drafting)?;
    if !drafter.is_configured() {
        tracing::warn!("No drafting API key configured. Question drafting is disabled");
    }

    let app_state = AppState::new(&app_settings, Arc::new(drafter))?;
    tracing::info!(
        public_base_url = %app_state.public_base_url,
        quiz.question_count = app_state.question_count,
        "Application state ready"
    );

    run_server(app_state, app_settings.server).await?;

    Ok(())
}
