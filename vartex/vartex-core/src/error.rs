//! Error types for the variability analysis.

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error taxonomy of the analysis core.
///
/// Only [`AnalysisError::IfdefEndifMismatch`] is a hard failure, and it is
/// scoped to a single file: the batch runner skips the offending file and
/// keeps going. The remaining variants describe recoverable conditions that
/// are logged and counted but never abort a run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Unbalanced conditional directives in one file. The file's partial
    /// results are discarded.
    #[error("ifdef and endif do not match in {file}")]
    IfdefEndifMismatch { file: String },

    /// A directive's condition text did not match the expression grammar or
    /// exceeded the recursion bound. The raw text is used verbatim instead.
    #[error("cannot parse condition expression: {text}")]
    ExpressionParse { text: String },

    /// An ancestor-tag path matched no known granularity pattern.
    #[error("granularity of path {path:?} not recognized (line {line})")]
    GranularityClassification { path: Vec<String>, line: usize },

    /// An external signature-equivalence oracle failed. Treated as
    /// "no match" by the merger.
    #[error("equivalence check failed: {0}")]
    Equivalence(String),
}

impl AnalysisError {
    /// Create a new structural mismatch error for the given file.
    pub fn mismatch(file: impl Into<String>) -> Self {
        Self::IfdefEndifMismatch { file: file.into() }
    }

    /// Create a new expression parse error.
    pub fn parse(text: impl Into<String>) -> Self {
        Self::ExpressionParse { text: text.into() }
    }

    /// Create a new equivalence oracle error.
    pub fn equivalence(msg: impl Into<String>) -> Self {
        Self::Equivalence(msg.into())
    }
}
