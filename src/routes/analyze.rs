//! Upload and analysis endpoint.

use axum::{
    Json,
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http::StatusCode;

use super::ApiError;
use crate::{
    AppState,
    analysis::{AnalysisOptions, AnalysisResult, analyze_with},
    ingest::{TableFormat, read_table},
};

/// Name of the multipart field carrying the statement.
const FILE_FIELD: &str = "file";

struct Upload {
    filename: String,
    data: Bytes,
}

/// Analyze an uploaded statement.
///
/// Upload problems (no file, no filename, unsupported extension) are answered
/// with a failed analysis result and 400. A failed analysis is answered with
/// 422, a successful one with 200.
#[tracing::instrument(name = "api.analyze", skip(state, multipart))]
pub async fn analyze_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::new(
            e.status(),
            "multipart_error",
            format!("Failed to read multipart field: {}", e),
        )
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| {
            ApiError::new(
                e.status(),
                "file_read_error",
                format!("Failed to read uploaded file: {}", e),
            )
        })?;
        upload = Some(Upload { filename, data });
    }

    let Some(upload) = upload else {
        return Ok(rejected("missing_file", "no file was uploaded"));
    };
    if upload.filename.is_empty() {
        return Ok(rejected("missing_filename", "no file was selected"));
    }
    let format = match TableFormat::from_filename(&upload.filename) {
        Ok(format) => format,
        Err(err) => return Ok(rejected("unsupported_file_type", err.to_string())),
    };

    tracing::info!(
        filename = %upload.filename,
        size = upload.data.len(),
        "Received statement upload"
    );

    let options = AnalysisOptions::from(&state.config.analysis);
    let sheet = state.config.analysis.sheet.clone();
    let result = tokio::task::spawn_blocking(move || {
        let table = read_table(upload.data.to_vec(), format, sheet.as_deref())?;
        Ok::<_, ApiError>(analyze_with(&table, &options))
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Analysis task failed");
        ApiError::internal("Analysis task failed")
    })??;

    let status = if result.is_success() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(result)).into_response())
}

fn rejected(code: &str, message: impl Into<String>) -> Response {
    let message = message.into();
    tracing::debug!(code, %message, "Rejected upload");
    (
        StatusCode::BAD_REQUEST,
        Json(AnalysisResult::failure(code, message)),
    )
        .into_response()
}
