//! XLSX export of analysis results

use rust_xlsxwriter::{Format, Workbook};

use super::{ExportError, flatten_report, require_report};
use crate::{analysis::AnalysisResult, config::ExportConfig};

const COLUMN_WIDTHS: [f64; 4] = [40.0, 14.0, 28.0, 16.0];

/// Export a successful analysis to a single-sheet workbook.
///
/// The sheet holds the same records as the CSV export, with a bold header
/// row and usage written as numeric cells.
pub fn export_xlsx(
    result: &AnalysisResult,
    config: &ExportConfig,
) -> Result<Vec<u8>, ExportError> {
    let report = require_report(result)?;
    let records = flatten_report(report, &config.labels);

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&config.sheet_name)?;

    for (col, (label, width)) in config
        .labels
        .header()
        .into_iter()
        .zip(COLUMN_WIDTHS)
        .enumerate()
    {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, label, &bold)?;
        worksheet.set_column_width(col, width)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = u32::try_from(i + 1)
            .map_err(|_| ExportError::InvalidInput("too many rows for a worksheet".into()))?;
        worksheet.write_string(row, 0, &record.account_key)?;
        worksheet.write_string(row, 1, &record.date)?;
        worksheet.write_string(row, 2, &record.model)?;
        worksheet.write_number(row, 3, record.usage as f64)?;
    }

    tracing::debug!(rows = records.len(), sheet = %config.sheet_name, "Wrote XLSX export");

    Ok(workbook.save_to_buffer()?)
}
