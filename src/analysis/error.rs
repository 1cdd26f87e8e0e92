/// Failures of the analysis pipeline.
///
/// All variants are collapsed into [`super::AnalysisResult::Failure`] by
/// [`super::analyze`]; none of them escape the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("the file is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("no rows found for bundle \"{bundle}\"")]
    NoMatchingRows { bundle: String },

    #[error("cannot interpret \"{value}\" as a date (row {row})")]
    DateParse { value: String, row: usize },

    #[error("cannot interpret \"{value}\" as a token usage amount (row {row})")]
    InvalidUsage { value: String, row: usize },

    #[error("{0}")]
    Unexpected(String),
}

impl AnalysisError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::MissingColumns(_) => "missing_columns",
            AnalysisError::NoMatchingRows { .. } => "no_matching_rows",
            AnalysisError::DateParse { .. } => "date_parse_error",
            AnalysisError::InvalidUsage { .. } => "invalid_usage",
            AnalysisError::Unexpected(_) => "analysis_error",
        }
    }
}
