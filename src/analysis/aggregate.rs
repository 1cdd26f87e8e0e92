use std::collections::{BTreeMap, BTreeSet, btree_map::Entry};

use chrono::NaiveDate;
use rust_decimal::{Decimal, prelude::ToPrimitive};

use super::AnalysisError;
use crate::models::{BillingRecord, KeyUsage, ModelUsage, UsageReport, format_date};

/// Grouped sums over the filtered records, at full decimal precision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageAggregate {
    /// (key, date, model) → usage. The leaves of the report.
    pub daily_by_model: BTreeMap<(String, NaiveDate, String), Decimal>,
    /// (key, date) → usage across models. Not part of the report; the
    /// report's per-day figures are always the sum of its model entries.
    pub daily_totals: BTreeMap<(String, NaiveDate), Decimal>,
    /// key → usage across every day and model.
    pub key_totals: BTreeMap<String, Decimal>,
    pub grand_total: Decimal,
    pub dates: BTreeSet<NaiveDate>,
}

/// First pass: fold records into grouped sums.
///
/// Sums are checked; a total beyond the decimal range is an
/// [`AnalysisError::Unexpected`] rather than a panic.
pub fn aggregate(records: &[BillingRecord]) -> Result<UsageAggregate, AnalysisError> {
    records
        .iter()
        .try_fold(UsageAggregate::default(), |mut acc, record| {
            add_to(
                acc.daily_by_model.entry((
                    record.account_key.clone(),
                    record.date,
                    record.model.clone(),
                )),
                record.usage,
            )?;
            add_to(
                acc.daily_totals
                    .entry((record.account_key.clone(), record.date)),
                record.usage,
            )?;
            add_to(
                acc.key_totals.entry(record.account_key.clone()),
                record.usage,
            )?;
            acc.grand_total = checked_sum(acc.grand_total, record.usage)?;
            acc.dates.insert(record.date);
            Ok(acc)
        })
}

fn add_to<K: Ord>(entry: Entry<'_, K, Decimal>, usage: Decimal) -> Result<(), AnalysisError> {
    let total = entry.or_default();
    *total = checked_sum(*total, usage)?;
    Ok(())
}

fn checked_sum(total: Decimal, usage: Decimal) -> Result<Decimal, AnalysisError> {
    total
        .checked_add(usage)
        .ok_or_else(|| AnalysisError::Unexpected("usage total overflowed".to_string()))
}

/// Second pass: reshape grouped sums into the key → date → models tree.
///
/// Model entries for a date come out sorted by model name, following the
/// grouping order.
pub fn build_report(
    aggregate: UsageAggregate,
    bundle_name: &str,
) -> Result<UsageReport, AnalysisError> {
    let mut data: BTreeMap<String, KeyUsage> = BTreeMap::new();

    for ((key, date, model), usage) in aggregate.daily_by_model {
        let usage = to_reported(usage)?;
        data.entry(key)
            .or_default()
            .daily
            .entry(format_date(date))
            .or_default()
            .push(ModelUsage { model, usage });
    }

    for (key, total) in &aggregate.key_totals {
        if let Some(entry) = data.get_mut(key) {
            entry.total = to_reported(*total)?;
        }
    }

    Ok(UsageReport {
        data,
        dates: aggregate.dates.into_iter().map(format_date).collect(),
        grand_total: to_reported(aggregate.grand_total)?,
        bundle_name: bundle_name.to_string(),
    })
}

/// Externally reported figures are whole tokens, truncated toward zero.
fn to_reported(value: Decimal) -> Result<u64, AnalysisError> {
    value.trunc().to_u64().ok_or_else(|| {
        AnalysisError::Unexpected(format!("usage total {value} is out of range"))
    })
}
