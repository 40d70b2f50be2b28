//! Medical image analyzer: stage an uploaded image, ask Gemini for findings,
//! optionally ask again for an ELI5 restatement.

pub mod analysis;
pub mod config;
pub mod error;
pub mod gemini;
pub mod prompts;
pub mod session;
pub mod staging;
pub mod web;

pub use config::Config;
pub use error::{AnalyzerError, Result};
pub use gemini::{GeminiClient, GenerativeModel, Part};
pub use session::{InteractionState, Session, SessionStore, SessionView};
pub use staging::{ImageKind, StagedImage};
