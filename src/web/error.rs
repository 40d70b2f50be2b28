// JSON error responses for the HTTP API

use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::AnalyzerError;

#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: &'static str,
}

impl ApiError {
    pub fn new(status_code: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            error_code,
        }
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            format!("Upload exceeds the {limit} byte limit"),
        )
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        let (status, code) = match &err {
            AnalyzerError::ConfigurationMissing => {
                (StatusCode::SERVICE_UNAVAILABLE, "CONFIGURATION_MISSING")
            }
            AnalyzerError::UnsupportedImage { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_IMAGE")
            }
            AnalyzerError::InvalidUpload(_) => (StatusCode::BAD_REQUEST, "INVALID_UPLOAD"),
            AnalyzerError::NoStagedFile => (StatusCode::CONFLICT, "NO_STAGED_FILE"),
            AnalyzerError::NoAnalysis => (StatusCode::CONFLICT, "NO_ANALYSIS"),
            AnalyzerError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            AnalyzerError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            AnalyzerError::Http(_) => (StatusCode::BAD_GATEWAY, "MODEL_UNREACHABLE"),
            AnalyzerError::Api { .. } => (StatusCode::BAD_GATEWAY, "MODEL_ERROR"),
            AnalyzerError::Decode(_) => (StatusCode::BAD_GATEWAY, "MODEL_BAD_RESPONSE"),
        };

        if status.is_server_error() {
            error!(error = %err, "Request failed");
        } else {
            warn!(error = %err, "Request rejected");
        }

        Self::new(status, code, err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        warn!(error = %err, "Bad multipart body");
        Self::new(err.status(), "INVALID_UPLOAD", err.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        warn!(error = %err, "Bad path parameter");
        Self::new(err.status(), "INVALID_SESSION_ID", err.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        warn!(error = %err, "Bad JSON body");
        Self::new(err.status(), "INVALID_BODY", err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": true,
            "message": self.message,
            "error_code": self.error_code,
            "status": self.status_code.as_u16()
        });

        (self.status_code, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
