// Medical Image Analyzer web server backed by Google Gemini

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use medical_image_analyzer::web::{self, AppState};
use medical_image_analyzer::{Config, GeminiClient, GenerativeModel};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let model: Option<Arc<dyn GenerativeModel>> = match config.api_key() {
        Some(api_key) => {
            let client = GeminiClient::new(
                api_key,
                &config.model,
                &config.api_base,
                config.request_timeout(),
            )
            .context("failed to build Gemini client")?;
            Some(Arc::new(client))
        }
        None => {
            warn!("API key is missing. Set GEMINI_API_KEY in your environment. Analysis is disabled.");
            None
        }
    };

    let staging_dir = config.staging_dir();
    std::fs::create_dir_all(&staging_dir)
        .with_context(|| format!("failed to create staging dir {}", staging_dir.display()))?;

    let state = Arc::new(AppState::from_config(&config, model));
    web::spawn_session_sweeper(state.clone(), config.session_idle());
    let app = web::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    info!(
        addr = %config.bind,
        model = %config.model,
        staging_dir = %staging_dir.display(),
        "🩺 Medical Image Analyzer running"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
