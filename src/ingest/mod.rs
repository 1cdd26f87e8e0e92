//! Decoding uploaded statements into a [`BillingTable`].
//!
//! Spreadsheets (`.xlsx`, `.xlsm`, `.xls`, `.ods`) are read with calamine and
//! delimited text (`.csv`) with the csv crate. The first row is the header.

mod csv_source;
mod spreadsheet;

use std::path::Path;

use crate::models::BillingTable;

/// Error type for reading statements
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unsupported file type '{0}'; expected one of: {exts}", exts = TableFormat::EXTENSIONS.join(", "))]
    UnsupportedFormat(String),

    #[error("the file is empty")]
    EmptyFile,

    #[error("the workbook has no worksheets")]
    NoWorksheet,

    #[error("worksheet '{0}' was not found")]
    SheetNotFound(String),

    #[error("the sheet has no header row")]
    MissingHeader,

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),
}

/// Input formats understood by [`read_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Spreadsheet,
    Csv,
}

impl TableFormat {
    /// Accepted file extensions, lower case.
    pub const EXTENSIONS: [&'static str; 5] = ["xlsx", "xlsm", "xls", "ods", "csv"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Some(TableFormat::Spreadsheet),
            "csv" => Some(TableFormat::Csv),
            _ => None,
        }
    }

    /// Detect the format from a file name's extension.
    pub fn from_filename(name: &str) -> Result<Self, IngestError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| IngestError::UnsupportedFormat(ext.to_string()))
    }
}

/// Decode `bytes` into a table.
///
/// `sheet` selects a worksheet by name; the first worksheet is used when it
/// is `None`. It is ignored for CSV input.
pub fn read_table(
    bytes: Vec<u8>,
    format: TableFormat,
    sheet: Option<&str>,
) -> Result<BillingTable, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile);
    }

    let table = match format {
        TableFormat::Spreadsheet => spreadsheet::read_workbook(bytes, sheet)?,
        TableFormat::Csv => csv_source::read_csv(&bytes)?,
    };

    tracing::debug!(
        columns = table.columns().len(),
        rows = table.len(),
        ?format,
        "Read statement table"
    );

    Ok(table)
}

/// Read a statement from disk, detecting the format from its extension.
pub fn read_path(path: &Path, sheet: Option<&str>) -> Result<BillingTable, IngestError> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let format = TableFormat::from_filename(name)?;
    let bytes = std::fs::read(path).map_err(|e| IngestError::Io(e, path.to_path_buf()))?;
    read_table(bytes, format, sheet)
}
