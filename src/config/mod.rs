//! Configuration module for the usage analyzer.
//!
//! The analyzer is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax. Every section is
//! optional; an empty file yields a working configuration.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 5000
//!
//! [analysis]
//! target_bundle_name = "${TARGET_BUNDLE}"
//!
//! [export.labels]
//! subtotal = "小计"
//! grand_total = "总计"
//! ```

mod analysis;
mod export;
mod observability;
mod server;

use std::path::Path;

pub use analysis::*;
pub use export::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use server::*;

/// Default config file looked up in the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tokentally.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Which bundle to analyze and how the statement's columns are named.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Export labels, markers and file naming.
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let config: AppConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate().map_err(ConfigError::Validation)?;
        self.analysis.validate().map_err(ConfigError::Validation)?;
        self.export.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Default configuration written by `tokentally init`.
pub fn default_config_toml() -> &'static str {
    r#"# tokentally configuration

[server]
host = "0.0.0.0"
port = 5000
# Largest accepted upload, in bytes
body_limit_bytes = 16777216

[analysis]
# Only rows whose bundle column equals this value are analyzed
target_bundle_name = "GLM Coding Pro V2 - 季"
# Worksheet to read; defaults to the first sheet
# sheet = "Sheet1"

[analysis.columns]
account_key = "apiKey"
billing_date = "账期(自然日)"
bundle_name = "Tokens资源包名称"
usage = "用量"
model = "模型产品名称"

[export]
filename_prefix = "token_usage"
sheet_name = "Token Usage"
csv_bom = true

[export.labels]
account_key = "API Key"
date = "Date"
model = "Model"
usage = "Token Usage"
subtotal = "subtotal"
grand_total = "grand total"
placeholder = "-"

[observability.logging]
level = "info"
format = "compact"
"#
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_str("").unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.analysis.target_bundle_name, "GLM Coding Pro V2 - 季");
        assert_eq!(config.analysis.columns.account_key, "apiKey");
        assert_eq!(config.export.labels.subtotal, "subtotal");
        assert!(config.export.csv_bom);
    }

    #[test]
    fn test_default_config_toml_parses() {
        let config = AppConfig::from_str(default_config_toml()).unwrap();
        assert_eq!(config.server.body_limit_bytes, 16 * 1024 * 1024);
        assert_eq!(config.analysis.columns.usage, "用量");
        assert_eq!(config.export.sheet_name, "Token Usage");
    }

    #[test]
    fn test_custom_bundle_and_columns() {
        let config = AppConfig::from_str(
            r#"
            [analysis]
            target_bundle_name = "Team Plan"
            sheet = "Details"

            [analysis.columns]
            account_key = "key"
            billing_date = "day"
            bundle_name = "bundle"
            usage = "tokens"
            model = "model"
        "#,
        )
        .unwrap();

        assert_eq!(config.analysis.target_bundle_name, "Team Plan");
        assert_eq!(config.analysis.sheet.as_deref(), Some("Details"));
        assert_eq!(
            config.analysis.columns.required(),
            ["key", "day", "bundle", "tokens", "model"]
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = AppConfig::from_str(
            r#"
            [analysis]
            target_bundle = "typo"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_bundle_name_rejected() {
        let err = AppConfig::from_str(
            r#"
            [analysis]
            target_bundle_name = ""
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_duplicate_column_names_rejected() {
        let err = AppConfig::from_str(
            r#"
            [analysis.columns]
            account_key = "same"
            model = "same"
        "#,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("same"), "should name the duplicate column: {msg}");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokentally.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_from_missing_file() {
        let err = AppConfig::from_file("/nonexistent/tokentally.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("TEST_TARGET_BUNDLE", Some("Pro Plan"), || {
            let config = AppConfig::from_str(
                r#"
                [analysis]
                target_bundle_name = "${TEST_TARGET_BUNDLE}"
            "#,
            )
            .unwrap();
            assert_eq!(config.analysis.target_bundle_name, "Pro Plan");
        });
    }

    #[test]
    fn test_missing_env_var() {
        temp_env::with_var_unset("TEST_MISSING_BUNDLE", || {
            let err = expand_env_vars("name = \"${TEST_MISSING_BUNDLE}\"").unwrap_err();
            assert!(matches!(err, ConfigError::EnvVarNotFound(ref v) if v == "TEST_MISSING_BUNDLE"));
        });
    }

    #[test]
    fn test_env_var_in_comment_ignored() {
        let result = expand_env_vars("# target = \"${NONEXISTENT_VAR}\"").unwrap();
        assert_eq!(result, "# target = \"${NONEXISTENT_VAR}\"");
    }

    #[test]
    fn test_env_var_after_comment_ignored() {
        let result = expand_env_vars("key = \"value\" # ${NONEXISTENT_VAR}").unwrap();
        assert_eq!(result, "key = \"value\" # ${NONEXISTENT_VAR}");
    }

    #[test]
    fn test_multiline_with_comments() {
        temp_env::with_var("TEST_MULTI", Some("value1"), || {
            let input = r#"key1 = "${TEST_MULTI}"
# key2 = "${NONEXISTENT}"
key3 = "literal""#;
            let result = expand_env_vars(input).unwrap();
            assert_eq!(
                result,
                r#"key1 = "value1"
# key2 = "${NONEXISTENT}"
key3 = "literal""#
            );
        });
    }
}
