//! Server configuration: CLI flags with environment fallbacks.
//!
//! `.env` is loaded by `main` before parsing, so every `env = ...` below can
//! also come from that file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, Parser)]
#[command(name = "medical-image-analyzer")]
#[command(about = "Upload a medical image and get AI-powered findings from Gemini")]
pub struct Config {
    /// Gemini API key. The server still starts without one, but analysis is disabled.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model identifier
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the Gemini REST API
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Address to listen on
    #[arg(long, env = "ANALYZER_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Directory for staged uploads (defaults to the OS temp dir)
    #[arg(long, env = "ANALYZER_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "ANALYZER_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Drop sessions (and their staged files) after this many idle seconds
    #[arg(long, env = "ANALYZER_SESSION_IDLE_SECS", default_value_t = DEFAULT_SESSION_IDLE_SECS)]
    pub session_idle_secs: u64,

    /// Per-request timeout for model calls, in seconds. Unset means wait indefinitely.
    #[arg(long, env = "ANALYZER_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// API key, treating an empty value as missing.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
