//! CSV export of analysis results

use csv::Writer;

use super::{ExportError, flatten_report, require_report};
use crate::{analysis::AnalysisResult, config::ExportConfig};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Export a successful analysis to CSV.
///
/// Output is a header row followed by the flattened records, one line each.
pub fn export_csv(result: &AnalysisResult, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
    let report = require_report(result)?;

    let buf = if config.csv_bom {
        UTF8_BOM.to_vec()
    } else {
        Vec::new()
    };
    let mut wtr = Writer::from_writer(buf);

    wtr.write_record(config.labels.header())?;
    for record in flatten_report(report, &config.labels) {
        wtr.write_record(record.fields())?;
    }

    wtr.into_inner()
        .map_err(|e| ExportError::Write(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_report;

    fn lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_export_rows_in_order() {
        let config = ExportConfig {
            csv_bom: false,
            ..Default::default()
        };
        let bytes = export_csv(&AnalysisResult::Success(sample_report()), &config).unwrap();

        assert_eq!(
            lines(&bytes),
            vec![
                "API Key,Date,Model,Token Usage",
                "k1,2024-01-01,m1,10",
                "k1,2024-01-01,m2,5",
                "k2,2024-01-02,m1,7",
                "k1,subtotal,-,15",
                "k2,subtotal,-,7",
                "grand total,-,-,22",
            ]
        );
    }

    #[test]
    fn test_bom_prefix() {
        let bytes = export_csv(
            &AnalysisResult::Success(sample_report()),
            &ExportConfig::default(),
        )
        .unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        assert!(bytes[UTF8_BOM.len()..].starts_with(b"API Key,"));
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let mut report = sample_report();
        let usage = report.data.remove("k2").unwrap();
        report.data.insert("key,with comma".into(), usage);
        let config = ExportConfig {
            csv_bom: false,
            ..Default::default()
        };

        let bytes = export_csv(&AnalysisResult::Success(report), &config).unwrap();
        assert!(lines(&bytes).contains(&"\"key,with comma\",2024-01-02,m1,7".to_string()));
    }

    #[test]
    fn test_failure_rejected() {
        let result = AnalysisResult::failure("missing_columns", "analysis failed: missing");
        assert!(matches!(
            export_csv(&result, &ExportConfig::default()),
            Err(ExportError::NotSuccessful(_))
        ));
    }
}
