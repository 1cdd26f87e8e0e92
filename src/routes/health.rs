//! Health check and service info endpoints.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Bundle the service analyzes.
#[derive(Debug, Serialize, Deserialize)]
pub struct BundleInfo {
    pub bundle_name: String,
}

#[tracing::instrument(name = "health.check")]
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn bundle_info(State(state): State<AppState>) -> Json<BundleInfo> {
    Json(BundleInfo {
        bundle_name: state.config.analysis.target_bundle_name.clone(),
    })
}
