//! Bundle usage analysis.
//!
//! The pipeline runs in four stages over an in-memory [`BillingTable`]:
//!
//! 1. [`validate`]: every required column is present (checked before anything else)
//! 2. [`filter`]: keep the target bundle's rows, normalize dates, coerce usage
//! 3. [`aggregate`]: grouped sums by key/date/model, key/date, key
//! 4. reshape into a [`UsageReport`] tree
//!
//! [`analyze`] is the boundary of the pipeline: every failure is converted
//! into [`AnalysisResult::Failure`] there, so callers never see an `Err`.

mod aggregate;
mod error;
mod filter;
mod validate;

use std::{
    collections::BTreeMap,
    panic::{AssertUnwindSafe, catch_unwind},
};

pub use aggregate::{UsageAggregate, aggregate, build_report};
pub use error::AnalysisError;
pub use filter::{FilteredRows, filter_bundle, parse_date, parse_usage};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
pub use validate::{ColumnIndex, missing_columns, resolve_columns};

use crate::{
    config::{AnalysisConfig, ColumnNames},
    models::{BillingTable, KeyUsage, UsageReport},
};

/// Prefix of every failure message produced by [`analyze`].
const FAILURE_PREFIX: &str = "analysis failed";

/// Inputs of a single analysis besides the table itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub target_bundle: String,
    pub columns: ColumnNames,
}

impl AnalysisOptions {
    /// Options for `target_bundle` with the default statement column names.
    pub fn new(target_bundle: impl Into<String>) -> Self {
        Self {
            target_bundle: target_bundle.into(),
            columns: ColumnNames::default(),
        }
    }
}

impl From<&AnalysisConfig> for AnalysisOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            target_bundle: config.target_bundle_name.clone(),
            columns: config.columns.clone(),
        }
    }
}

/// Outcome of one analysis. Built once per call and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    Success(UsageReport),
    Failure(AnalysisFailure),
}

/// A failed analysis, carrying a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFailure {
    pub error: String,
    pub code: String,
    /// The pipeline error, when the failure came from [`analyze`] in this
    /// process. Absent for results decoded from JSON.
    pub cause: Option<AnalysisError>,
}

impl AnalysisResult {
    /// A failure raised outside the pipeline (e.g. an unreadable upload).
    pub fn failure(code: impl Into<String>, error: impl Into<String>) -> Self {
        AnalysisResult::Failure(AnalysisFailure {
            error: error.into(),
            code: code.into(),
            cause: None,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success(_))
    }

    pub fn report(&self) -> Option<&UsageReport> {
        match self {
            AnalysisResult::Success(report) => Some(report),
            AnalysisResult::Failure(_) => None,
        }
    }
}

impl From<AnalysisError> for AnalysisResult {
    fn from(err: AnalysisError) -> Self {
        AnalysisResult::Failure(AnalysisFailure {
            error: format!("{FAILURE_PREFIX}: {err}"),
            code: err.code().to_string(),
            cause: Some(err),
        })
    }
}

/// Analyze `table` for `target_bundle` using the default column names.
pub fn analyze(table: &BillingTable, target_bundle: &str) -> AnalysisResult {
    analyze_with(table, &AnalysisOptions::new(target_bundle))
}

/// Analyze `table` with explicit options.
#[tracing::instrument(
    name = "analysis.analyze",
    skip_all,
    fields(bundle = %options.target_bundle, rows = table.len())
)]
pub fn analyze_with(table: &BillingTable, options: &AnalysisOptions) -> AnalysisResult {
    let outcome = catch_unwind(AssertUnwindSafe(|| run_pipeline(table, options)))
        .unwrap_or_else(|panic| {
            let cause = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(AnalysisError::Unexpected(cause))
        });

    match outcome {
        Ok(report) => {
            tracing::info!(
                keys = report.data.len(),
                dates = report.dates.len(),
                grand_total = report.grand_total,
                "Analysis complete"
            );
            AnalysisResult::Success(report)
        }
        Err(err) => {
            tracing::warn!(error = %err, code = err.code(), "Analysis failed");
            err.into()
        }
    }
}

fn run_pipeline(
    table: &BillingTable,
    options: &AnalysisOptions,
) -> Result<UsageReport, AnalysisError> {
    let columns = resolve_columns(table, &options.columns)?;

    let filtered = filter_bundle(table, &columns, &options.target_bundle)?;
    if filtered.skipped > 0 {
        tracing::warn!(
            skipped = filtered.skipped,
            "Ignored bundle rows with an empty account key or model"
        );
    }

    let aggregate = aggregate(&filtered.records)?;
    for ((key, date), usage) in &aggregate.daily_totals {
        tracing::debug!(account_key = %key, %date, %usage, "Daily total");
    }

    build_report(aggregate, &options.target_bundle)
}

#[derive(Serialize)]
struct SuccessWire<'a> {
    success: bool,
    #[serde(flatten)]
    report: &'a UsageReport,
}

#[derive(Serialize)]
struct FailureWire<'a> {
    success: bool,
    error: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_columns: Option<&'a [String]>,
}

impl Serialize for AnalysisResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AnalysisResult::Success(report) => SuccessWire {
                success: true,
                report,
            }
            .serialize(serializer),
            AnalysisResult::Failure(failure) => FailureWire {
                success: false,
                error: &failure.error,
                code: &failure.code,
                missing_columns: match &failure.cause {
                    Some(AnalysisError::MissingColumns(names)) => Some(names),
                    _ => None,
                },
            }
            .serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
struct ResultWire {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    data: Option<BTreeMap<String, KeyUsage>>,
    #[serde(default)]
    dates: Option<Vec<String>>,
    #[serde(default)]
    grand_total: Option<u64>,
    #[serde(default)]
    bundle_name: Option<String>,
}

impl<'de> Deserialize<'de> for AnalysisResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = ResultWire::deserialize(deserializer)?;

        if !wire.success {
            return Ok(AnalysisResult::failure(
                wire.code.unwrap_or_else(|| "analysis_error".to_string()),
                wire.error.unwrap_or_else(|| FAILURE_PREFIX.to_string()),
            ));
        }

        match (wire.data, wire.dates, wire.grand_total, wire.bundle_name) {
            (Some(data), Some(dates), Some(grand_total), Some(bundle_name)) => {
                Ok(AnalysisResult::Success(UsageReport {
                    data,
                    dates,
                    grand_total,
                    bundle_name,
                }))
            }
            _ => Err(de::Error::custom(
                "successful result must contain data, dates, grand_total and bundle_name",
            )),
        }
    }
}
