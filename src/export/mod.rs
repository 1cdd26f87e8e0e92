//! Tabular exports of a successful analysis.
//!
//! Both exporters share [`flatten_report`], which produces the exported
//! record sequence: every leaf (key, date, model) in tree order, then one
//! subtotal record per key, then a single grand-total record.

mod csv_export;
mod xlsx_export;

use chrono::Utc;

pub use csv_export::export_csv;
pub use xlsx_export::export_xlsx;
use crate::{
    analysis::AnalysisResult,
    config::{ExportConfig, ExportLabels},
    models::UsageReport,
};

/// Error type for export operations
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("only a successful analysis can be exported: {0}")]
    NotSuccessful(String),

    #[error("invalid analysis result: {0}")]
    InvalidInput(String),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to write export: {0}")]
    Write(#[from] std::io::Error),
}

/// One exported row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub account_key: String,
    pub date: String,
    pub model: String,
    pub usage: u64,
}

impl ExportRecord {
    pub fn fields(&self) -> [String; 4] {
        [
            self.account_key.clone(),
            self.date.clone(),
            self.model.clone(),
            self.usage.to_string(),
        ]
    }
}

/// Flatten a report into export records.
pub fn flatten_report(report: &UsageReport, labels: &ExportLabels) -> Vec<ExportRecord> {
    let mut records = Vec::with_capacity(report.leaf_count() + report.data.len() + 1);

    for (key, usage) in &report.data {
        for (date, models) in &usage.daily {
            records.extend(models.iter().map(|entry| ExportRecord {
                account_key: key.clone(),
                date: date.clone(),
                model: entry.model.clone(),
                usage: entry.usage,
            }));
        }
    }

    records.extend(report.data.iter().map(|(key, usage)| ExportRecord {
        account_key: key.clone(),
        date: labels.subtotal.clone(),
        model: labels.placeholder.clone(),
        usage: usage.total,
    }));

    records.push(ExportRecord {
        account_key: labels.grand_total.clone(),
        date: labels.placeholder.clone(),
        model: labels.placeholder.clone(),
        usage: report.grand_total,
    });

    records
}

/// The report of `result`, or [`ExportError::NotSuccessful`].
pub fn require_report(result: &AnalysisResult) -> Result<&UsageReport, ExportError> {
    match result {
        AnalysisResult::Success(report) => Ok(report),
        AnalysisResult::Failure(failure) => Err(ExportError::NotSuccessful(failure.error.clone())),
    }
}

/// Decode an analysis result previously produced by the analyzer.
pub fn parse_result(json: &[u8]) -> Result<AnalysisResult, ExportError> {
    serde_json::from_slice(json).map_err(|e| ExportError::InvalidInput(e.to_string()))
}

/// Supported export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    /// Download file name for an export made today, e.g. `token_usage_20240131.csv`.
    pub fn filename(&self, prefix: &str) -> String {
        format!(
            "{prefix}_{}.{}",
            Utc::now().date_naive().format("%Y%m%d"),
            self.extension()
        )
    }

    /// Serialize `result` in this format.
    pub fn export(
        &self,
        result: &AnalysisResult,
        config: &ExportConfig,
    ) -> Result<Vec<u8>, ExportError> {
        match self {
            ExportFormat::Csv => export_csv(result, config),
            ExportFormat::Xlsx => export_xlsx(result, config),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use crate::models::{KeyUsage, ModelUsage, UsageReport};

    fn models(entries: &[(&str, u64)]) -> Vec<ModelUsage> {
        entries
            .iter()
            .map(|(model, usage)| ModelUsage {
                model: model.to_string(),
                usage: *usage,
            })
            .collect()
    }

    /// Two keys over two days, matching the four-row scenario.
    pub fn sample_report() -> UsageReport {
        let mut data = BTreeMap::new();
        data.insert(
            "k1".to_string(),
            KeyUsage {
                total: 15,
                daily: BTreeMap::from([(
                    "2024-01-01".to_string(),
                    models(&[("m1", 10), ("m2", 5)]),
                )]),
            },
        );
        data.insert(
            "k2".to_string(),
            KeyUsage {
                total: 7,
                daily: BTreeMap::from([("2024-01-02".to_string(), models(&[("m1", 7)]))]),
            },
        );
        UsageReport {
            data,
            dates: vec!["2024-01-01".into(), "2024-01-02".into()],
            grand_total: 22,
            bundle_name: "T".into(),
        }
    }
}
