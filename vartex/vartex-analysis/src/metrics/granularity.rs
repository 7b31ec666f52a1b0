//! Syntactic granularity of conditional branches.
//!
//! The *outer* granularity of a branch is decided by the ancestor-tag path
//! from its opening directive up to the compilation unit: an `#ifdef` sitting
//! directly in the unit extends the compilation unit, one inside
//! `block,function` extends a function body, one inside a loop header
//! extends a statement block, and so on. The table of recognized paths is
//! fixed and ordered; a path matching no pattern is a classification error
//! that is counted and reported, never dropped silently.
//!
//! The *inner* granularity classifies what a branch adds, from the tags it
//! encloses: whole named blocks, unnamed blocks, statements, expressions, or
//! parameters.

use serde::{Deserialize, Serialize};
use vartex_core::{AnalysisError, Result, WalkEvent};

use crate::walker::TagRecord;

/// Syntactic scope a branch extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OuterGranularity {
    /// Directly inside the compilation unit.
    CompilationUnit,
    /// Inside a function body or an extern/nested block.
    Function,
    /// Inside a struct, union, or enum declaration.
    TypeDeclaration,
    /// Inside an if/loop/switch-style block.
    StatementBlock,
    /// Inside a condition or return expression.
    Expression,
    /// A statement-level extension.
    Statement,
    /// Inside a parameter or argument list.
    Parameter,
}

/// Classify the ancestor-tag path of a branch opener (nearest ancestor
/// first, compilation unit excluded).
///
/// `Ok(None)` marks paths that are recognized but not counted (a function
/// prototype); `Err` is a classification error for the caller to count.
pub fn classify_outer(path: &[String], line: usize) -> Result<Option<OuterGranularity>> {
    let tag = |i: usize| path.get(i).map(String::as_str);

    if path.is_empty() {
        return Ok(Some(OuterGranularity::CompilationUnit));
    }

    let unknown = || {
        Err(AnalysisError::GranularityClassification {
            path: path.to_vec(),
            line,
        })
    };

    match tag(0).unwrap() {
        "block" => match tag(1) {
            None => Ok(Some(OuterGranularity::Function)),
            Some("function" | "extern" | "block") => Ok(Some(OuterGranularity::Function)),
            Some("struct" | "union" | "enum") => Ok(Some(OuterGranularity::TypeDeclaration)),
            Some("expr") => Ok(Some(OuterGranularity::TypeDeclaration)),
            Some(
                "while" | "for" | "then" | "do" | "else" | "switch" | "case" | "default",
            ) => Ok(Some(OuterGranularity::StatementBlock)),
            Some("decl") => Ok(Some(OuterGranularity::TypeDeclaration)),
            Some(_) => unknown(),
        },
        "expr" => match tag(1) {
            Some("expr_stmt") => Ok(Some(OuterGranularity::Statement)),
            Some("condition" | "return") => Ok(Some(OuterGranularity::Expression)),
            Some("argument") => Ok(Some(OuterGranularity::Statement)),
            Some("block") => Ok(Some(OuterGranularity::TypeDeclaration)),
            Some("init" | "index") => Ok(Some(OuterGranularity::Statement)),
            _ => unknown(),
        },
        "while" | "do" => Ok(Some(OuterGranularity::StatementBlock)),
        "expr_stmt" if path.len() == 1 => Ok(Some(OuterGranularity::Statement)),
        "expr_stmt" if tag(1) == Some("block") && tag(2) == Some("struct") => {
            Ok(Some(OuterGranularity::TypeDeclaration))
        }
        "decl_stmt" => Ok(Some(OuterGranularity::Statement)),
        "condition" => Ok(Some(OuterGranularity::Expression)),
        "if" | "else" | "case" | "default" | "then" | "for" => {
            Ok(Some(OuterGranularity::StatementBlock))
        }
        "parameter_list" | "argument_list" => Ok(Some(OuterGranularity::Parameter)),
        "argument" if tag(1) == Some("argument_list") => Ok(Some(OuterGranularity::Statement)),
        "init" if tag(1) == Some("decl") => Ok(Some(OuterGranularity::Statement)),
        // function prototype: recognized, not counted
        "function" => Ok(None),
        _ => unknown(),
    }
}

/// Outer-granularity histogram plus the classification-error count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranularityHistogram {
    pub compilation_unit: usize,
    pub function: usize,
    pub type_declaration: usize,
    pub statement_block: usize,
    pub expression: usize,
    pub statement: usize,
    pub parameter: usize,
    pub errors: usize,
}

impl GranularityHistogram {
    pub fn count(&mut self, granularity: OuterGranularity) {
        match granularity {
            OuterGranularity::CompilationUnit => self.compilation_unit += 1,
            OuterGranularity::Function => self.function += 1,
            OuterGranularity::TypeDeclaration => self.type_declaration += 1,
            OuterGranularity::StatementBlock => self.statement_block += 1,
            OuterGranularity::Expression => self.expression += 1,
            OuterGranularity::Statement => self.statement += 1,
            OuterGranularity::Parameter => self.parameter += 1,
        }
    }

    pub fn merge(&mut self, other: &GranularityHistogram) {
        self.compilation_unit += other.compilation_unit;
        self.function += other.function;
        self.type_declaration += other.type_declaration;
        self.statement_block += other.statement_block;
        self.expression += other.expression;
        self.statement += other.statement;
        self.parameter += other.parameter;
        self.errors += other.errors;
    }
}

/// What a branch adds, judged from one enclosed tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InnerGranularity {
    MacroDirective,
    NamedBlock,
    UnnamedBlock,
    Expression,
    Statement,
    Parameter,
}

/// Inner-granularity counts plus the classification-error count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerCounts {
    pub macro_directive: usize,
    pub named_block: usize,
    pub unnamed_block: usize,
    pub expression: usize,
    pub statement: usize,
    pub parameter: usize,
    pub errors: usize,
}

impl InnerCounts {
    pub fn merge(&mut self, other: &InnerCounts) {
        self.macro_directive += other.macro_directive;
        self.named_block += other.named_block;
        self.unnamed_block += other.unnamed_block;
        self.expression += other.expression;
        self.statement += other.statement;
        self.parameter += other.parameter;
        self.errors += other.errors;
    }
}

fn inner_kind(tag: &str) -> Option<Option<InnerGranularity>> {
    match tag {
        // structural noise inside directives
        "name" | "endif" => Some(None),
        "define" | "directive" | "include" | "macro" | "undef" => {
            Some(Some(InnerGranularity::MacroDirective))
        }
        "struct" | "union" | "enum" | "function" | "extern" | "function_decl" | "decl_stmt"
        | "typedef" => Some(Some(InnerGranularity::NamedBlock)),
        "if" | "while" | "return" | "then" | "for" | "do" | "case" | "else" | "block" => {
            Some(Some(InnerGranularity::UnnamedBlock))
        }
        "param" | "argument" => Some(Some(InnerGranularity::Parameter)),
        "expr" | "condition" => Some(Some(InnerGranularity::Expression)),
        "expr_stmt" | "decl" | "init" => Some(Some(InnerGranularity::Statement)),
        _ => None,
    }
}

/// Classify the tags enclosed by one branch.
///
/// A recognized enter-event counts its construct once and then skips
/// everything until the matching exit, so nested tags of a counted
/// construct are not double-counted.
pub fn classify_inner(tags: &[TagRecord]) -> InnerCounts {
    let mut counts = InnerCounts::default();
    let mut skip_until: Option<(&str, usize)> = None;

    for record in tags {
        if let Some((tag, line)) = skip_until {
            if record.tag == tag && record.event == WalkEvent::Exit && record.line == line {
                skip_until = None;
            }
            continue;
        }

        match inner_kind(&record.tag) {
            Some(None) => continue,
            Some(Some(kind)) => {
                match kind {
                    InnerGranularity::MacroDirective => counts.macro_directive += 1,
                    InnerGranularity::NamedBlock => counts.named_block += 1,
                    InnerGranularity::UnnamedBlock => counts.unnamed_block += 1,
                    InnerGranularity::Expression => counts.expression += 1,
                    InnerGranularity::Statement => counts.statement += 1,
                    InnerGranularity::Parameter => counts.parameter += 1,
                }
                if record.event == WalkEvent::Enter {
                    skip_until = Some((record.tag.as_str(), record.line));
                }
            }
            None => counts.errors += 1,
        }
    }
    counts
}
