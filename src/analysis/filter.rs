use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, prelude::FromPrimitive};

use super::{AnalysisError, ColumnIndex};
use crate::models::{BillingRecord, BillingTable, Cell};

/// Date-only layouts accepted in text cells.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Date-time layouts accepted in text cells; the time of day is discarded.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Largest serial number Excel can represent (9999-12-31).
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Rows that matched the bundle, plus how many of them were dropped because
/// their account key or model was empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredRows {
    pub records: Vec<BillingRecord>,
    pub skipped: usize,
}

/// Keep rows whose bundle cell equals `target_bundle` exactly and convert
/// them to typed records.
///
/// The date is normalized to a calendar day and usage is coerced to an exact
/// decimal here, once; later stages never re-interpret cell values.
pub fn filter_bundle(
    table: &BillingTable,
    columns: &ColumnIndex,
    target_bundle: &str,
) -> Result<FilteredRows, AnalysisError> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for row in 0..table.len() {
        let matches_bundle = matches!(
            table.cell(row, columns.bundle_name),
            Cell::Text(bundle) if bundle == target_bundle
        );
        if !matches_bundle {
            continue;
        }

        let sheet_row = table.row_number(row);

        let date_cell = table.cell(row, columns.billing_date);
        let date = parse_date(date_cell).ok_or_else(|| AnalysisError::DateParse {
            value: date_cell.to_string(),
            row: sheet_row,
        })?;

        let usage_cell = table.cell(row, columns.usage);
        let usage = parse_usage(usage_cell).ok_or_else(|| AnalysisError::InvalidUsage {
            value: usage_cell.to_string(),
            row: sheet_row,
        })?;

        let account_key = table.cell(row, columns.account_key).to_label();
        let model = table.cell(row, columns.model).to_label();
        let (Some(account_key), Some(model)) = (account_key, model) else {
            tracing::debug!(row = sheet_row, "Skipping row without account key or model");
            skipped += 1;
            continue;
        };

        records.push(BillingRecord {
            account_key,
            date,
            model,
            usage,
        });
    }

    if records.is_empty() {
        return Err(AnalysisError::NoMatchingRows {
            bundle: target_bundle.to_string(),
        });
    }

    Ok(FilteredRows { records, skipped })
}

/// Interpret a cell as a calendar day.
///
/// Accepts spreadsheet date cells, ISO dates and date-times, `YYYY/MM/DD`,
/// `YYYY.MM.DD`, `YYYYMMDD`, RFC 3339 timestamps and Excel serial numbers.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Text(s) => parse_date_str(s.trim()),
        Cell::Int(i) => compact_date(*i).or_else(|| excel_serial_date(*i as f64)),
        Cell::Float(f) => excel_serial_date(*f),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok().and_then(compact_date);
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// `20240131` → 2024-01-31.
fn compact_date(value: i64) -> Option<NaiveDate> {
    if !(10_000_101..=99_991_231).contains(&value) {
        return None;
    }
    let year = (value / 10_000) as i32;
    let month = ((value / 100) % 100) as u32;
    let day = (value % 100) as u32;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Excel's 1900 date system: serial 1 is 1900-01-01 and serial 61 is
/// 1900-03-01. Serial 60 is the nonexistent 1900-02-29 and is rejected.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as u64;
    let epoch = match days {
        1..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        60 => return None,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    let date = epoch.checked_add_days(Days::new(days))?;
    (date.year() <= 9999).then_some(date)
}

/// Interpret a cell as a non-negative token amount.
///
/// Empty cells count as zero. Negative or non-numeric values are rejected.
pub fn parse_usage(cell: &Cell) -> Option<Decimal> {
    let value = match cell {
        Cell::Empty => Some(Decimal::ZERO),
        Cell::Int(i) => Some(Decimal::from(*i)),
        Cell::Float(f) => Decimal::from_f64(*f),
        Cell::Text(s) if s.trim().is_empty() => Some(Decimal::ZERO),
        Cell::Text(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        Cell::Bool(_) | Cell::DateTime(_) => None,
    }?;

    (!value.is_sign_negative() || value.is_zero()).then_some(value)
}
