use serde::{Deserialize, Serialize};

/// Export configuration: file naming, worksheet name and row labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Download file name prefix; the export date and extension are appended,
    /// e.g. `token_usage_20240131.csv`. ASCII only, since it goes into a
    /// `Content-Disposition` header.
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    /// Worksheet name used by the XLSX exporter.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Prefix CSV output with a UTF-8 byte order mark so spreadsheet
    /// applications detect the encoding.
    #[serde(default = "default_true")]
    pub csv_bom: bool,

    /// Header labels and synthetic row markers.
    #[serde(default)]
    pub labels: ExportLabels,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filename_prefix: default_filename_prefix(),
            sheet_name: default_sheet_name(),
            csv_bom: true,
            labels: ExportLabels::default(),
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.filename_prefix.is_empty()
            || !self
                .filename_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(format!(
                "export.filename_prefix '{}' must be non-empty and use only ASCII letters, digits, '_', '-' or '.'",
                self.filename_prefix
            ));
        }

        // Excel worksheet naming rules
        let len = self.sheet_name.chars().count();
        if len == 0 || len > 31 {
            return Err("export.sheet_name must be 1 to 31 characters".into());
        }
        if self
            .sheet_name
            .chars()
            .any(|c| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        {
            return Err(format!(
                "export.sheet_name '{}' contains a character not allowed in worksheet names",
                self.sheet_name
            ));
        }

        self.labels.validate()
    }
}

fn default_filename_prefix() -> String {
    "token_usage".to_string()
}

fn default_sheet_name() -> String {
    "Token Usage".to_string()
}

fn default_true() -> bool {
    true
}

/// Column headers and the literal markers of synthetic summary rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportLabels {
    #[serde(default = "default_account_key_label")]
    pub account_key: String,
    #[serde(default = "default_date_label")]
    pub date: String,
    #[serde(default = "default_model_label")]
    pub model: String,
    #[serde(default = "default_usage_label")]
    pub usage: String,
    /// Written in the date column of per-key subtotal rows.
    #[serde(default = "default_subtotal")]
    pub subtotal: String,
    /// Written in the key column of the grand-total row.
    #[serde(default = "default_grand_total")]
    pub grand_total: String,
    /// Fills the remaining text columns of subtotal and grand-total rows.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for ExportLabels {
    fn default() -> Self {
        Self {
            account_key: default_account_key_label(),
            date: default_date_label(),
            model: default_model_label(),
            usage: default_usage_label(),
            subtotal: default_subtotal(),
            grand_total: default_grand_total(),
            placeholder: default_placeholder(),
        }
    }
}

impl ExportLabels {
    /// Header row in field order: key, date, model, usage.
    pub fn header(&self) -> [&str; 4] {
        [&self.account_key, &self.date, &self.model, &self.usage]
    }

    fn validate(&self) -> Result<(), String> {
        if self.header().iter().any(|h| h.is_empty()) {
            return Err("export.labels column headers must not be empty".into());
        }
        if self.subtotal.is_empty() || self.grand_total.is_empty() {
            return Err("export.labels subtotal and grand_total markers must not be empty".into());
        }
        Ok(())
    }
}

fn default_account_key_label() -> String {
    "API Key".to_string()
}

fn default_date_label() -> String {
    "Date".to_string()
}

fn default_model_label() -> String {
    "Model".to_string()
}

fn default_usage_label() -> String {
    "Token Usage".to_string()
}

fn default_subtotal() -> String {
    "subtotal".to_string()
}

fn default_grand_total() -> String {
    "grand total".to_string()
}

fn default_placeholder() -> String {
    "-".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ExportConfig::default().validate().is_ok());
    }

    #[test]
    fn test_non_ascii_prefix_rejected() {
        let config = ExportConfig {
            filename_prefix: "统计".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sheet_name_rules() {
        let too_long = ExportConfig {
            sheet_name: "x".repeat(32),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let bad_char = ExportConfig {
            sheet_name: "usage/2024".into(),
            ..Default::default()
        };
        assert!(bad_char.validate().is_err());

        let cjk = ExportConfig {
            sheet_name: "Token使用量统计".into(),
            ..Default::default()
        };
        assert!(cjk.validate().is_ok());
    }
}
