//! Export endpoints: an analysis result in, a file download out.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http::header;

use super::ApiError;
use crate::{
    AppState,
    export::{ExportFormat, parse_result},
};

/// Download response with attachment headers.
pub struct FileDownload {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

impl IntoResponse for FileDownload {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.filename),
                ),
            ],
            self.data,
        )
            .into_response()
    }
}

pub async fn export_csv(State(state): State<AppState>, body: Bytes) -> Result<FileDownload, ApiError> {
    export(state, body, ExportFormat::Csv).await
}

pub async fn export_xlsx(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<FileDownload, ApiError> {
    export(state, body, ExportFormat::Xlsx).await
}

#[tracing::instrument(name = "api.export", skip(state, body), fields(size = body.len()))]
async fn export(state: AppState, body: Bytes, format: ExportFormat) -> Result<FileDownload, ApiError> {
    let result = parse_result(&body)?;
    let config = state.config.export.clone();

    let data = tokio::task::spawn_blocking(move || format.export(&result, &config))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Export task failed");
            ApiError::internal("Export task failed")
        })??;

    let filename = format.filename(&state.config.export.filename_prefix);
    tracing::info!(%filename, bytes = data.len(), "Generated export");

    Ok(FileDownload {
        data,
        filename,
        content_type: format.content_type(),
    })
}
