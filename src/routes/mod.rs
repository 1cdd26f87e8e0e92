//! HTTP routes.
//!
//! | Route | |
//! |---|---|
//! | `GET /health` | liveness and version |
//! | `GET /api/bundle` | the configured target bundle |
//! | `POST /api/analyze` | multipart upload (field `file`) → analysis result JSON |
//! | `POST /api/export/csv` | analysis result JSON → CSV download |
//! | `POST /api/export/xlsx` | analysis result JSON → XLSX download |

mod analyze;
mod error;
mod export;
pub mod health;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
pub use error::{ApiError, ErrorInfo, ErrorResponse};
pub use export::FileDownload;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{AppState, middleware};

/// Build the application router.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    let api = Router::new()
        .route("/bundle", get(health::bundle_info))
        .route("/analyze", post(analyze::analyze_upload))
        .route("/export/csv", post(export::export_csv))
        .route("/export/xlsx", post(export::export_xlsx));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
