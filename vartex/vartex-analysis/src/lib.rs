//! C preprocessor variability analysis.
//!
//! Computes, for an annotated source tree produced by an external
//! source-to-markup converter, which configuration compiles which code
//! fragment — the *feature signature* of every conditional branch — and the
//! metrics derived from those signatures.
//!
//! # Architecture
//!
//! ## Core pipeline
//! - [`walker`] - stack machine turning enter/exit node events into
//!   conditional blocks with per-branch signatures, code, and enclosed tags
//! - [`expr`] - operator-precedence parser normalizing directive conditions
//!   into a canonical token alphabet
//! - [`merge`] - project-wide grouping of equivalent signatures behind a
//!   pluggable equivalence predicate
//!
//! ## Derived metrics
//! - [`metrics`] - nesting depths, scattering and tangling degrees, feature
//!   kind, code homogeneity, and syntactic granularity
//! - [`macros`] - feature constants and function-like macro bookkeeping
//!
//! ## Batch processing
//! - [`analysis`] - rayon fan-out over files, sequential fan-in merge
//! - [`output`] - CSV report tables
//!
//! # Quick Start
//!
//! ```
//! use vartex_analysis::VariabilityAnalysis;
//! use vartex_core::{AnalysisConfig, Ns, TreeBuilder};
//!
//! // #ifdef CONFIG_NET … #endif, as the converter would mark it up
//! let mut b = TreeBuilder::new();
//! b.open(Ns::Cpp, "ifdef", 1);
//! b.leaf(Ns::Cpp, "directive", 1, Some("ifdef"), Some(" "));
//! b.leaf(Ns::Src, "name", 1, Some("CONFIG_NET"), None);
//! b.close();
//! b.tail("\nnet_init();\n");
//! b.open(Ns::Cpp, "endif", 3);
//! b.close();
//! let tree = b.finish();
//!
//! let analysis = VariabilityAnalysis::new(AnalysisConfig::default());
//! let report = analysis.analyze_project(&[("net.c".to_string(), tree)]);
//! assert_eq!(report.features.entries["CONFIG_NET"].codes, vec!["net_init();\n"]);
//! assert_eq!(report.nesting.max, 1);
//! ```
//!
//! Errors are scoped: a file with unbalanced directives is skipped, an
//! unparsable condition falls back to its raw text, an unknown granularity
//! path is counted — only the caller decides to stop.

pub mod analysis;
pub mod expr;
pub mod macros;
pub mod merge;
pub mod metrics;
pub mod output;
pub mod walker;

pub use analysis::{FileAnalysis, FileReport, ProjectReport, VariabilityAnalysis};
pub use expr::{ExpressionParser, ParsedExpression};
pub use macros::MacroRegistry;
pub use merge::{
    MergedFeature, ProjectFeatures, SignatureEquivalence, SignatureMerger, TextualEquivalence,
};
pub use walker::{
    BranchKind, ConditionalBlockWalker, FeatureEntry, FileFeatures, FileWalk, TagRecord,
};
