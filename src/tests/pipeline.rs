use std::{collections::BTreeMap, io::Cursor};

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use crate::{
    analysis::{AnalysisResult, analyze},
    config::{ColumnNames, ExportConfig, ExportLabels},
    export::{export_csv, export_xlsx, flatten_report, parse_result},
    ingest::{TableFormat, read_table},
    models::{KeyUsage, ModelUsage},
};

const BUNDLE: &str = "GLM Coding Pro V2 - 季";

/// A statement laid out like the provider's billing export, with a mix of
/// real date cells and text dates.
fn statement_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let sheet = workbook.add_worksheet();

    let header = ColumnNames::default();
    for (col, name) in header.required().iter().enumerate() {
        sheet.write_string(0, col as u16, *name).unwrap();
    }

    let rows: [(&str, Option<(u16, u8, u8)>, &str, &str, f64, &str); 6] = [
        ("key-a", Some((2024, 3, 2)), "", BUNDLE, 1200.0, "glm-4.6"),
        ("key-a", Some((2024, 3, 1)), "", BUNDLE, 300.0, "glm-4.5-air"),
        ("key-a", None, "2024-03-01 08:15:00", BUNDLE, 700.0, "glm-4.6"),
        ("key-b", None, "2024/03/02", BUNDLE, 50.0, "glm-4.6"),
        ("key-b", Some((2024, 3, 2)), "", "Other Bundle", 9999.0, "glm-4.6"),
        ("key-a", Some((2024, 3, 1)), "", BUNDLE, 0.0, "glm-4.5-air"),
    ];

    for (i, (key, date, date_text, bundle, usage, model)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *key).unwrap();
        match date {
            Some((y, m, d)) => {
                let date = ExcelDateTime::from_ymd(*y, *m, *d).unwrap();
                sheet
                    .write_datetime_with_format(row, 1, &date, &date_format)
                    .unwrap();
            }
            None => {
                sheet.write_string(row, 1, *date_text).unwrap();
            }
        }
        sheet.write_string(row, 2, *bundle).unwrap();
        sheet.write_number(row, 3, *usage).unwrap();
        sheet.write_string(row, 4, *model).unwrap();
    }

    workbook.save_to_buffer().unwrap()
}

fn analyze_statement() -> AnalysisResult {
    let table = read_table(statement_xlsx(), TableFormat::Spreadsheet, None).unwrap();
    analyze(&table, BUNDLE)
}

#[test]
fn test_spreadsheet_to_report() {
    let result = analyze_statement();
    let report = result.report().expect("analysis should succeed");

    assert_eq!(report.dates, vec!["2024-03-01", "2024-03-02"]);
    assert_eq!(report.bundle_name, BUNDLE);

    let a = &report.data["key-a"];
    assert_eq!(a.total, 2200);
    let day1: Vec<_> = a.daily["2024-03-01"]
        .iter()
        .map(|m| (m.model.as_str(), m.usage))
        .collect();
    assert_eq!(day1, vec![("glm-4.5-air", 300), ("glm-4.6", 700)]);
    assert_eq!(a.daily["2024-03-02"][0].usage, 1200);

    // The other bundle's row for key-b is excluded
    assert_eq!(report.data["key-b"].total, 50);
    assert_eq!(report.grand_total, 2250);
}

#[test]
fn test_spreadsheet_round_trip_through_xlsx_export() {
    let result = analyze_statement();
    let bytes = export_xlsx(&result, &ExportConfig::default()).unwrap();

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range("Token Usage").unwrap();
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();

    // header + 4 leaves + 2 subtotals + grand total
    assert_eq!(rows.len(), 8);
    assert_eq!(
        rows[1],
        vec![
            Data::String("key-a".into()),
            Data::String("2024-03-01".into()),
            Data::String("glm-4.5-air".into()),
            Data::Float(300.0),
        ]
    );
    assert_eq!(rows[5][0], Data::String("key-a".into()));
    assert_eq!(rows[5][1], Data::String("subtotal".into()));
    assert_eq!(rows[5][3], Data::Float(2200.0));
    assert_eq!(rows[7][0], Data::String("grand total".into()));
    assert_eq!(rows[7][3], Data::Float(2250.0));

    let leaf_sum: f64 = rows[1..5]
        .iter()
        .filter_map(|r| match r[3] {
            Data::Float(f) => Some(f),
            _ => None,
        })
        .sum();
    assert_eq!(leaf_sum, 2250.0);
}

/// Re-aggregate exported leaf rows, skipping subtotal and grand-total rows.
fn rebuild_tree(
    rows: impl IntoIterator<Item = [String; 4]>,
    labels: &ExportLabels,
) -> BTreeMap<String, KeyUsage> {
    let mut data: BTreeMap<String, KeyUsage> = BTreeMap::new();
    for [key, date, model, usage] in rows {
        if key == labels.grand_total || date == labels.subtotal {
            continue;
        }
        let usage: u64 = usage.parse().unwrap();
        let entry = data.entry(key).or_default();
        entry.total += usage;
        entry
            .daily
            .entry(date)
            .or_default()
            .push(ModelUsage { model, usage });
    }
    data
}

#[test]
fn test_exported_leaves_rebuild_the_report() {
    let result = analyze_statement();
    let report = result.report().unwrap();
    let config = ExportConfig {
        csv_bom: false,
        ..Default::default()
    };

    let csv_bytes = export_csv(&result, &config).unwrap();
    let mut reader = csv::Reader::from_reader(csv_bytes.as_slice());
    let csv_rows: Vec<[String; 4]> = reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            std::array::from_fn(|i| r[i].to_string())
        })
        .collect();
    assert_eq!(csv_rows.len(), 4 + 2 + 1);
    assert_eq!(rebuild_tree(csv_rows, &config.labels), report.data);

    let xlsx_bytes = export_xlsx(&result, &config).unwrap();
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(xlsx_bytes)).unwrap();
    let range = workbook.worksheet_range(&config.sheet_name).unwrap();
    let xlsx_rows: Vec<[String; 4]> = range
        .rows()
        .skip(1)
        .map(|r| {
            std::array::from_fn(|i| match &r[i] {
                Data::Float(f) => (*f as u64).to_string(),
                other => other.to_string(),
            })
        })
        .collect();
    assert_eq!(rebuild_tree(xlsx_rows, &config.labels), report.data);
}

#[test]
fn test_decoded_json_result_exports_identically() {
    let result = analyze_statement();
    let json = serde_json::to_vec(&result).unwrap();
    let decoded = parse_result(&json).unwrap();

    let config = ExportConfig::default();
    assert_eq!(
        export_csv(&decoded, &config).unwrap(),
        export_csv(&result, &config).unwrap()
    );
}

#[test]
fn test_csv_statement() {
    let input = "apiKey,账期(自然日),Tokens资源包名称,用量,模型产品名称\n\
        k1,20240105,Plan,1.5e3,m1\n\
        k1,2024.01.05,Plan,250.75,m1\n\
        k2,2024-01-04T10:00:00+08:00,Plan,,m2\n\
        k3,2024-01-04,Plan,10,\n";
    let table = read_table(input.as_bytes().to_vec(), TableFormat::Csv, None).unwrap();
    let result = analyze(&table, "Plan");
    let report = result.report().unwrap();

    assert_eq!(report.dates, vec!["2024-01-04", "2024-01-05"]);
    // 1500 + 250.75 truncated once
    assert_eq!(report.data["k1"].total, 1750);
    // empty usage counts as zero
    assert_eq!(report.data["k2"].total, 0);
    // rows with no model are not grouped
    assert!(!report.data.contains_key("k3"));

    let records = flatten_report(report, &ExportConfig::default().labels);
    assert_eq!(records.len(), 2 + 2 + 1);
    assert_eq!(records.last().unwrap().usage, 1750);
}

#[test]
fn test_statement_without_usage_column() {
    let input = "apiKey,账期(自然日),Tokens资源包名称,模型产品名称\nk1,2024-01-01,Plan,m1\n";
    let table = read_table(input.as_bytes().to_vec(), TableFormat::Csv, None).unwrap();

    let AnalysisResult::Failure(failure) = analyze(&table, "Plan") else {
        panic!("expected failure");
    };
    assert_eq!(failure.code, "missing_columns");
    assert!(failure.error.contains("用量"));
    assert!(export_csv(&AnalysisResult::Failure(failure), &ExportConfig::default()).is_err());
}
