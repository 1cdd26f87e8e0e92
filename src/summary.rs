//! Plain-text rendering of a usage report for terminal output.

use std::fmt::Write;

use crate::models::UsageReport;

/// Render `report` as an indented per-key, per-day listing.
pub fn render_summary(report: &UsageReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_summary(&mut out, report);
    out
}

fn write_summary(out: &mut String, report: &UsageReport) -> std::fmt::Result {
    writeln!(out, "Bundle:      {}", report.bundle_name)?;
    writeln!(out, "Keys:        {}", report.data.len())?;
    match (report.dates.first(), report.dates.last()) {
        (Some(first), Some(last)) => {
            writeln!(out, "Dates:       {first} .. {last} ({} days)", report.dates.len())?
        }
        _ => writeln!(out, "Dates:       none")?,
    }
    writeln!(out, "Grand total: {}", group_digits(report.grand_total))?;

    for (key, usage) in &report.data {
        writeln!(out)?;
        writeln!(out, "{key}  total {}", group_digits(usage.total))?;
        for (date, models) in &usage.daily {
            let day_total: u64 = models.iter().map(|m| m.usage).sum();
            writeln!(out, "  {date}  {}", group_digits(day_total))?;
            for entry in models {
                writeln!(out, "    {:<32} {:>16}", entry.model, group_digits(entry.usage))?;
            }
        }
    }

    Ok(())
}

/// `1234567` → `1,234,567`
fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::export::test_support::sample_report;

    #[rstest]
    #[case(0, "0")]
    #[case(999, "999")]
    #[case(1000, "1,000")]
    #[case(1234567, "1,234,567")]
    #[case(100000, "100,000")]
    fn test_group_digits(#[case] value: u64, #[case] expected: &str) {
        assert_eq!(group_digits(value), expected);
    }

    #[test]
    fn test_summary_lists_keys_and_days() {
        let text = render_summary(&sample_report());

        assert!(text.contains("Bundle:      T"));
        assert!(text.contains("Dates:       2024-01-01 .. 2024-01-02 (2 days)"));
        assert!(text.contains("Grand total: 22"));
        assert!(text.contains("k1  total 15"));
        assert!(text.contains("  2024-01-01  15"));
        let k1 = text.find("k1  total").unwrap();
        let k2 = text.find("k2  total").unwrap();
        assert!(k1 < k2);
    }
}
