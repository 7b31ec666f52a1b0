//! Core types for C preprocessor variability analysis.
//!
//! This crate holds what the analysis engine and its callers share:
//! - [`tree`] - the annotated source tree an external converter materializes
//! - [`config`] - run configuration
//! - [`error`] - the error taxonomy
//!
//! The analysis itself lives in `vartex-analysis`.

pub mod config;
pub mod error;
pub mod tree;

pub use config::{AnalysisConfig, SignatureMode};
pub use error::{AnalysisError, Result};
pub use tree::{DirectiveKind, NodeId, Ns, SourceTree, TreeBuilder, WalkEvent};
