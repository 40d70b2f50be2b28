//! Error types for the analyzer library.
//!
//! Empty model output is not an error: it maps to the sentinel strings in
//! [`crate::prompts`]. Everything here is a real failure that the web layer
//! turns into a status code.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("API key is missing. Set GEMINI_API_KEY in your environment.")]
    ConfigurationMissing,

    #[error("Unsupported image '{name}': expected a JPG, JPEG, or PNG file")]
    UnsupportedImage { name: String },

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("No staged image to analyze. Upload an image first.")]
    NoStagedFile,

    #[error("No analysis result yet. Analyze an image first.")]
    NoAnalysis,

    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to reach the model service: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model service error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AnalyzerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalyzerError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
