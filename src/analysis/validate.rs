use super::AnalysisError;
use crate::{config::ColumnNames, models::BillingTable};

/// Positions of the required columns in a validated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub account_key: usize,
    pub billing_date: usize,
    pub bundle_name: usize,
    pub usage: usize,
    pub model: usize,
}

/// Required column names absent from `table`, in the order they are given.
pub fn missing_columns(table: &BillingTable, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| table.column_index(name).is_none())
        .map(|name| name.to_string())
        .collect()
}

/// Validate the table header and resolve every required column to its index.
///
/// This is the only place columns are looked up by name; later stages work
/// on the resolved [`ColumnIndex`].
pub fn resolve_columns(
    table: &BillingTable,
    names: &ColumnNames,
) -> Result<ColumnIndex, AnalysisError> {
    let missing = missing_columns(table, &names.required());
    if !missing.is_empty() {
        return Err(AnalysisError::MissingColumns(missing));
    }

    let index = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| AnalysisError::MissingColumns(vec![name.to_string()]))
    };

    Ok(ColumnIndex {
        account_key: index(&names.account_key)?,
        billing_date: index(&names.billing_date)?,
        bundle_name: index(&names.bundle_name)?,
        usage: index(&names.usage)?,
        model: index(&names.model)?,
    })
}
