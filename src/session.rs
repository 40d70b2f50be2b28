//! Per-user interaction state and the store that holds it.
//!
//! Each action is a transition on [`Session`]. The store hands out one
//! `Arc<Mutex<Session>>` per id; holding the lock across a model call keeps a
//! session to one action at a time.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis;
use crate::error::{AnalyzerError, Result};
use crate::gemini::GenerativeModel;
use crate::staging::{ImageKind, StagedImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    Empty,
    FileStaged,
    Analyzed,
    Simplified,
}

#[derive(Debug, Default)]
pub struct Session {
    staged: Option<StagedImage>,
    last_result: Option<String>,
    simplified: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        if self.staged.is_some() {
            InteractionState::FileStaged
        } else if self.simplified.is_some() {
            InteractionState::Simplified
        } else if self.last_result.is_some() {
            InteractionState::Analyzed
        } else {
            InteractionState::Empty
        }
    }

    pub fn staged(&self) -> Option<&StagedImage> {
        self.staged.as_ref()
    }

    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    pub fn simplified(&self) -> Option<&str> {
        self.simplified.as_deref()
    }

    /// Stage a new upload. Any previously staged file is deleted and any
    /// earlier results are cleared.
    pub fn upload(&mut self, dir: &Path, original_name: &str, bytes: &[u8]) -> Result<()> {
        let staged = StagedImage::stage(dir, original_name, bytes)?;
        if let Some(previous) = self.staged.replace(staged) {
            debug!(file = previous.original_name(), "Replacing staged upload");
            previous.release();
        }
        self.last_result = None;
        self.simplified = None;
        Ok(())
    }

    /// Analyze the staged image. The staged file is gone afterwards whether
    /// or not the model call succeeded.
    pub async fn analyze(&mut self, model: &dyn GenerativeModel) -> Result<&str> {
        let staged = match self.staged.take() {
            Some(staged) if staged.exists() => staged,
            _ => return Err(AnalyzerError::NoStagedFile),
        };

        let result = analysis::analyze_image(model, staged).await?;
        info!(chars = result.len(), "Analysis complete");

        self.simplified = None;
        Ok(self.last_result.insert(result).as_str())
    }

    /// Ask the model to restate the last result in simpler terms.
    pub async fn simplify(&mut self, model: &dyn GenerativeModel) -> Result<&str> {
        let Some(result) = self.last_result.as_deref() else {
            return Err(AnalyzerError::NoAnalysis);
        };

        let simplified = analysis::simplify(model, result).await?;
        Ok(self.simplified.insert(simplified).as_str())
    }

    /// The "No" side of the ELI5 choice.
    pub fn clear_simplified(&mut self) -> Result<()> {
        if self.last_result.is_none() {
            return Err(AnalyzerError::NoAnalysis);
        }
        self.simplified = None;
        Ok(())
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.state(),
            staged: self.staged.as_ref().map(|s| StagedView {
                file_name: s.original_name().to_string(),
                kind: s.kind(),
            }),
            result: self.last_result.clone(),
            simplified: self.simplified.clone(),
        }
    }
}

/// JSON snapshot of a session for the page.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub state: InteractionState,
    pub staged: Option<StagedView>,
    pub result: Option<String>,
    pub simplified: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StagedView {
    pub file_name: String,
    pub kind: ImageKind,
}

struct StoreEntry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// Sessions by id. Every lookup refreshes the session's idle clock;
/// [`SessionStore::expire_idle`] drops the ones nobody has touched.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, StoreEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(
            id,
            StoreEntry {
                session: Arc::new(Mutex::new(Session::new())),
                last_seen: Instant::now(),
            },
        );
        info!(session = %id, "Session created");
        id
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AnalyzerError::SessionNotFound(id.to_string()))?;
        entry.last_seen = Instant::now();
        Ok(entry.session.clone())
    }

    /// Drop a session. Its staged file, if any, is deleted with it.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(_) => {
                info!(session = %id, "Session ended");
                Ok(())
            }
            None => Err(AnalyzerError::SessionNotFound(id.to_string())),
        }
    }

    /// Drop every session idle for at least `max_idle`, skipping any that a
    /// request is still holding. Returns how many were dropped.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let in_use = Arc::strong_count(&entry.session) > 1;
            let keep = in_use || entry.last_seen.elapsed() < max_idle;
            if !keep {
                debug!(session = %id, "Session expired");
            }
            keep
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
