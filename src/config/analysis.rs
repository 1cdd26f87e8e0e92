use serde::{Deserialize, Serialize};

/// Analysis configuration: the target bundle and the statement layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Only rows whose bundle column equals this string (exactly,
    /// case-sensitive, untrimmed) are aggregated.
    #[serde(default = "default_target_bundle")]
    pub target_bundle_name: String,

    /// Worksheet to read from uploaded workbooks. Defaults to the first sheet.
    #[serde(default)]
    pub sheet: Option<String>,

    /// Column headers of the billing statement.
    #[serde(default)]
    pub columns: ColumnNames,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_bundle_name: default_target_bundle(),
            sheet: None,
            columns: ColumnNames::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.target_bundle_name.is_empty() {
            return Err("analysis.target_bundle_name must not be empty".into());
        }
        if let Some(sheet) = &self.sheet
            && sheet.trim().is_empty()
        {
            return Err("analysis.sheet must not be blank when set".into());
        }
        self.columns.validate()
    }
}

fn default_target_bundle() -> String {
    "GLM Coding Pro V2 - 季".to_string()
}

/// Header names of the five columns a billing statement must carry.
///
/// Defaults match the provider's itemized billing export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnNames {
    #[serde(default = "default_account_key")]
    pub account_key: String,
    #[serde(default = "default_billing_date")]
    pub billing_date: String,
    #[serde(default = "default_bundle_name")]
    pub bundle_name: String,
    #[serde(default = "default_usage")]
    pub usage: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            account_key: default_account_key(),
            billing_date: default_billing_date(),
            bundle_name: default_bundle_name(),
            usage: default_usage(),
            model: default_model(),
        }
    }
}

impl ColumnNames {
    /// Required columns in declaration order: account key, billing date,
    /// bundle name, usage, model.
    pub fn required(&self) -> [&str; 5] {
        [
            &self.account_key,
            &self.billing_date,
            &self.bundle_name,
            &self.usage,
            &self.model,
        ]
    }

    fn validate(&self) -> Result<(), String> {
        let required = self.required();
        for (i, name) in required.iter().enumerate() {
            if name.trim().is_empty() {
                return Err("analysis.columns entries must not be empty".into());
            }
            if required[..i].contains(name) {
                return Err(format!(
                    "analysis.columns maps more than one field to column '{name}'"
                ));
            }
        }
        Ok(())
    }
}

fn default_account_key() -> String {
    "apiKey".to_string()
}

fn default_billing_date() -> String {
    "账期(自然日)".to_string()
}

fn default_bundle_name() -> String {
    "Tokens资源包名称".to_string()
}

fn default_usage() -> String {
    "用量".to_string()
}

fn default_model() -> String {
    "模型产品名称".to_string()
}
