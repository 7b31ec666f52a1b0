//! Analysis configuration.

use serde::{Deserialize, Serialize};

/// How branch signatures are composed from the condition history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureMode {
    /// Nested and sibling conditions are fully expanded into a conjunction,
    /// e.g. the `#elif B` branch of `#if A` becomes `(!(A)) && (B)`.
    Expanded,
    /// Each branch keeps only its locally written expression. Synthesized
    /// `#else` signatures, which correspond to no literal source text, are
    /// tagged with an internal marker prefix and filtered from the feature
    /// map.
    Flat,
}

/// Configuration shared by the walker, parser, and merger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Signature composition mode. One mode applies to a whole run; outputs
    /// produced under different modes must not be merged.
    pub signature_mode: SignatureMode,

    /// Recursion bound for the condition-expression parser. Expressions
    /// nesting deeper than this fall back to their raw text.
    pub max_expression_depth: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            signature_mode: SignatureMode::Expanded,
            max_expression_depth: 512,
        }
    }
}
