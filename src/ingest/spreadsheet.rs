use std::io::Cursor;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};

use super::IngestError;
use crate::models::{BillingTable, Cell};

/// Read one worksheet of a workbook held in memory.
pub(super) fn read_workbook(bytes: Vec<u8>, sheet: Option<&str>) -> Result<BillingTable, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let range = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(IngestError::SheetNotFound(name.to_string()));
            }
            workbook.worksheet_range(name)?
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or(IngestError::NoWorksheet)??,
    };

    range_to_table(&range)
}

fn range_to_table(range: &Range<Data>) -> Result<BillingTable, IngestError> {
    let mut rows = range.rows();
    let header = rows.next().ok_or(IngestError::MissingHeader)?;
    // Absolute position of the header; the used range may start lower down
    let header_row = range.start().map_or(0, |(row, _)| row as usize);

    let columns: Vec<String> = header.iter().map(|data| to_cell(data).to_string()).collect();
    let (row_numbers, rows): (Vec<usize>, Vec<Vec<Cell>>) = rows
        .enumerate()
        .map(|(i, row)| (header_row + i + 2, row.iter().map(to_cell).collect::<Vec<_>>()))
        .filter(|(_, row)| row.iter().any(|cell| !cell.is_empty()))
        .unzip();

    Ok(BillingTable::new(columns, rows).with_row_numbers(row_numbers))
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if !dt.is_duration() => Cell::DateTime(value),
            _ => Cell::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
        // Formula errors such as #N/A carry no usable value
        Data::Error(_) => Cell::Empty,
    }
}
