//! API error type rendered as `{"error": {"type", "message", "code", "request_id"}}`.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{export::ExportError, ingest::IngestError};

/// Error body returned by every route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error type classification (e.g. "invalid_request_error", "server_error")
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub code: Option<String>,
    /// Filled in by the request ID middleware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn with_type(
        error_type: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorInfo {
                error_type: error_type.into(),
                message: message.into(),
                code: Some(code.into()),
                request_id: None,
            },
        }
    }
}

/// Error response for API requests.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_type = if self.status.is_server_error() {
            "server_error"
        } else {
            "invalid_request_error"
        };
        let body = ErrorResponse::with_type(error_type, self.code, self.message);
        (self.status, Json(body)).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedFormat(_) => Self::bad_request("unsupported_file_type", err.to_string()),
            IngestError::EmptyFile => Self::bad_request("empty_file", err.to_string()),
            IngestError::Io(..) => {
                tracing::error!(error = %err, "Failed to read upload");
                Self::internal("Failed to read the uploaded file")
            }
            _ => Self::bad_request("unreadable_file", err.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::NotSuccessful(_) => Self::bad_request("not_exportable", err.to_string()),
            ExportError::InvalidInput(_) => Self::bad_request("invalid_result", err.to_string()),
            ExportError::Csv(_) | ExportError::Xlsx(_) | ExportError::Write(_) => {
                tracing::error!(error = %err, "Export failed");
                Self::internal("Failed to generate the export file")
            }
        }
    }
}
