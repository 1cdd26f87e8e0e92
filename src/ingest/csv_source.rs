use csv::{ReaderBuilder, Trim};

use super::IngestError;
use crate::models::{BillingTable, Cell};

/// Read delimited text. Every field is text; empty fields are empty cells.
pub(super) fn read_csv(bytes: &[u8]) -> Result<BillingTable, IngestError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(bytes);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if columns.iter().all(|c| c.trim().is_empty()) {
        return Err(IngestError::MissingHeader);
    }

    let mut rows = Vec::new();
    let mut row_numbers = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if let Some(position) = record.position() {
            row_numbers.push(position.line() as usize);
        }
        rows.push(record.iter().map(Cell::text).collect());
    }

    let table = BillingTable::new(columns, rows);
    Ok(if row_numbers.len() == table.len() {
        table.with_row_numbers(row_numbers)
    } else {
        table
    })
}
