use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A statement row that passed the bundle filter.
///
/// Usage is kept as an exact decimal so fractional source values sum without
/// drift; it is only truncated to an integer when reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingRecord {
    pub account_key: String,
    pub date: NaiveDate,
    pub model: String,
    pub usage: Decimal,
}

/// Token usage of one model on one day for one account key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub model: String,
    pub usage: u64,
}

/// Usage of a single account key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyUsage {
    /// Total tokens across every day and model.
    ///
    /// Truncated from the exact sum independently of the leaves, so with
    /// fractional source usage it can exceed the sum of the reported model
    /// entries (0.6 + 0.6 on two models reports a total of 1 over two 0s).
    pub total: u64,
    /// `YYYY-MM-DD` → per-model usage, sorted by model name. Days without
    /// activity for this key are absent.
    pub daily: BTreeMap<String, Vec<ModelUsage>>,
}

/// Aggregated usage of one bundle, keyed by account key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub data: BTreeMap<String, KeyUsage>,
    /// Every date with activity, ascending.
    pub dates: Vec<String>,
    pub grand_total: u64,
    pub bundle_name: String,
}

impl UsageReport {
    /// Number of (key, date, model) leaf entries.
    pub fn leaf_count(&self) -> usize {
        self.data
            .values()
            .flat_map(|k| k.daily.values())
            .map(Vec::len)
            .sum()
    }
}

/// Render a calendar day in the canonical `YYYY-MM-DD` form.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
