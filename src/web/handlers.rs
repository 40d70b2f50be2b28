use std::sync::Arc;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Multipart, Path, State},
    http::{request::Parts, StatusCode},
    response::{Html, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::error::AnalyzerError;
use crate::gemini::GenerativeModel;
use crate::session::SessionView;
use crate::staging::ImageKind;

const UPLOAD_FIELD: &str = "image";

#[derive(Serialize)]
pub struct StatusResponse {
    pub configured: bool,
    pub model: Option<String>,
}

#[derive(Serialize)]
pub struct CreatedSession {
    pub session_id: Uuid,
}

#[derive(Deserialize)]
pub struct SimplifyRequest {
    pub enabled: bool,
}

/// Session id from the `:id` path segment; a malformed id is a JSON 400.
pub struct SessionId(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state).await?;
        Ok(SessionId(id))
    }
}

fn require_model(state: &AppState) -> Result<&dyn GenerativeModel, AnalyzerError> {
    state
        .model
        .as_deref()
        .ok_or(AnalyzerError::ConfigurationMissing)
}

pub async fn index() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        configured: state.model.is_some(),
        model: state.model.as_ref().map(|m| m.name().to_string()),
    })
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<CreatedSession>) {
    let session_id = state.sessions.create().await;
    (StatusCode::CREATED, Json(CreatedSession { session_id }))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?;
    let view = session.lock().await.view();
    Ok(Json(view))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
) -> ApiResult<StatusCode> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
    mut multipart: Multipart,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AnalyzerError::InvalidUpload("missing file name".to_string()))?;
        let kind = ImageKind::from_file_name(&file_name).ok_or_else(|| {
            AnalyzerError::UnsupportedImage {
                name: file_name.clone(),
            }
        })?;

        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(AnalyzerError::InvalidUpload("empty file".to_string()).into());
        }
        if data.len() > state.max_upload_bytes {
            return Err(ApiError::payload_too_large(state.max_upload_bytes));
        }
        if !kind.matches_content(&data) {
            return Err(AnalyzerError::UnsupportedImage { name: file_name }.into());
        }

        info!(session = %id, file = %file_name, size = data.len(), "Upload received");

        let mut session = session.lock().await;
        session.upload(&state.staging_dir, &file_name, &data)?;
        return Ok(Json(session.view()));
    }

    Err(AnalyzerError::InvalidUpload(format!("missing '{UPLOAD_FIELD}' field")).into())
}

pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
) -> ApiResult<Json<SessionView>> {
    let model = require_model(&state)?;
    let session = state.sessions.get(id).await?;

    let mut session = session.lock().await;
    let start = std::time::Instant::now();
    session.analyze(model).await?;
    info!(session = %id, elapsed_ms = start.elapsed().as_millis() as u64, "Analysis complete");

    Ok(Json(session.view()))
}

pub async fn simplify(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
    request: Result<Json<SimplifyRequest>, JsonRejection>,
) -> ApiResult<Json<SessionView>> {
    let Json(request) = request?;
    let session = state.sessions.get(id).await?;

    if !request.enabled {
        let mut session = session.lock().await;
        session.clear_simplified()?;
        return Ok(Json(session.view()));
    }

    let model = require_model(&state)?;
    let mut session = session.lock().await;
    session.simplify(model).await?;
    Ok(Json(session.view()))
}
