//! HTTP surface: the page at `/` and the JSON API it drives.

pub mod error;
pub mod handlers;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::gemini::GenerativeModel;
use crate::session::SessionStore;

/// Slack on top of the upload limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct AppState {
    /// `None` when no API key was configured.
    pub model: Option<Arc<dyn GenerativeModel>>,
    pub sessions: SessionStore,
    pub staging_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(model: Option<Arc<dyn GenerativeModel>>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            sessions: SessionStore::new(),
            staging_dir: staging_dir.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn from_config(config: &Config, model: Option<Arc<dyn GenerativeModel>>) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            ..Self::new(model, config.staging_dir())
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::status))
        .route("/api/sessions", post(handlers::create_session))
        .route(
            "/api/sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/api/sessions/:id/upload", post(handlers::upload_image))
        .route("/api/sessions/:id/analyze", post(handlers::analyze_image))
        .route("/api/sessions/:id/simplify", post(handlers::simplify))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Periodically drop sessions idle for `max_idle`. Runs until the runtime
/// shuts down.
pub fn spawn_session_sweeper(state: Arc<AppState>, max_idle: Duration) -> JoinHandle<()> {
    let period = (max_idle / 4).clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);

    tokio::spawn(async move {
        info!(?max_idle, ?period, "Session sweeper started");
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let expired = state.sessions.expire_idle(max_idle).await;
            if expired > 0 {
                let remaining = state.sessions.len().await;
                info!(expired, remaining, "Expired idle sessions");
            }
        }
    })
}
