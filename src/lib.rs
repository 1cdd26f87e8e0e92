//! Token usage analysis for API billing statements.
//!
//! A statement spreadsheet is decoded into a [`models::BillingTable`],
//! filtered to one bundle, and aggregated per account key, day and model
//! into a [`models::UsageReport`]. Reports export to CSV and XLSX.
//!
//! ```no_run
//! use tokentally::{analysis, config::ExportConfig, export, ingest};
//!
//! let table = ingest::read_path("statement.xlsx".as_ref(), None)?;
//! let result = analysis::analyze(&table, "GLM Coding Pro V2 - 季");
//! let csv = export::export_csv(&result, &ExportConfig::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;

pub mod analysis;
pub mod config;
pub mod export;
pub mod ingest;
#[cfg(feature = "server")]
pub mod middleware;
pub mod models;
#[cfg(feature = "server")]
pub mod observability;
#[cfg(feature = "server")]
pub mod routes;
pub mod summary;

#[cfg(test)]
mod tests;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
}

impl AppState {
    pub fn new(config: config::AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}
