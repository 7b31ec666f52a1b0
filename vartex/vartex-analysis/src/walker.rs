//! Conditional-block extraction.
//!
//! A single document-order pass over a file's enter/exit events turns the
//! stream into per-branch records: every `#if`/`#ifdef`/`#ifndef`/`#elif`/
//! `#else` opens a branch whose feature signature is derived from the stack
//! of currently-open conditions, and every `#elif`/`#else`/`#endif` flushes
//! the branch that just ended, together with the code and the tags it
//! enclosed.
//!
//! The signature of a branch follows the sign/negation rule: scanning the
//! condition history front to back, an `elif`/`else` entry negates the entry
//! immediately before it; the final signature conjoins every `if`/`elif`
//! condition in turn, while `else` entries contribute nothing beyond the
//! negation they caused.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vartex_core::{
    AnalysisConfig, AnalysisError, DirectiveKind, NodeId, Ns, Result, SignatureMode, SourceTree,
    WalkEvent,
};

use crate::expr::parse_define;
use crate::macros::MacroRegistry;

/// Marker prefix tagging flat-mode signatures synthesized for `#else`
/// branches, which correspond to no literal source text.
pub const ELSE_MARKER: &str = "###";

/// Branch kinds of a conditional block. `#ifdef`/`#ifndef` open an `If`
/// branch like `#if` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchKind {
    If,
    Elif,
    Else,
}

/// One tag enclosed by a branch, with its traversal event and source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub tag: String,
    pub event: WalkEvent,
    pub line: usize,
}

/// Per-signature payload of a feature map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEntry {
    /// Nesting depth at which the signature was first seen (top level = 1).
    pub depth: usize,
    /// Code fragments governed by the signature, in flush order.
    pub codes: Vec<String>,
}

/// File-local feature map: walker signature to entry.
pub type FileFeatures = BTreeMap<String, FeatureEntry>;

/// Granularity record for one branch: the ancestor-tag path of its opening
/// directive, nearest ancestor first, document root excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuterRecord {
    pub signature: String,
    pub ancestor_path: Vec<String>,
    pub line: usize,
}

/// Everything one file's walk produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWalk {
    pub file: String,
    /// Signature → depth and code fragments (flat-mode `#else` signatures
    /// already filtered out).
    pub features: FileFeatures,
    /// Per flushed branch: signature and the tags it enclosed.
    pub branch_tags: Vec<(String, Vec<TagRecord>)>,
    /// Per branch of every closed block: granularity path of the opener.
    pub outer_records: Vec<OuterRecord>,
    /// Function-like macro definitions found in this file.
    pub registry: MacroRegistry,
    /// Line of the last element in the file.
    pub loc: usize,
}

#[derive(Debug)]
struct HistoryEntry {
    kind: BranchKind,
    condition: String,
}

#[derive(Debug)]
struct OpenBranch {
    signature: String,
    code: String,
    tags: Vec<TagRecord>,
}

/// The stack machine walking one file's event stream.
#[derive(Debug, Clone)]
pub struct ConditionalBlockWalker {
    config: AnalysisConfig,
}

impl ConditionalBlockWalker {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Walk `tree` and extract the file's conditional blocks.
    ///
    /// Fails with [`AnalysisError::IfdefEndifMismatch`] when the directive
    /// nesting is unbalanced; the caller is expected to skip the file and
    /// continue the batch.
    pub fn walk(&self, file: &str, tree: &SourceTree) -> Result<FileWalk> {
        let mut history: Vec<HistoryEntry> = Vec::new();
        let mut branches: Vec<OpenBranch> = Vec::new();
        let mut blocks: Vec<Vec<(String, NodeId)>> = Vec::new();

        let mut features = FileFeatures::new();
        let mut branch_tags = Vec::new();
        let mut outer_records = Vec::new();
        let mut registry = MacroRegistry::new();

        // true while inside a directive's own subtree: condition tokens are
        // not feature code
        let mut in_conditional = false;
        let mut in_endif = false;

        for (event, id) in tree.events() {
            let directive = tree.directive(id);

            match (event, directive) {
                (WalkEvent::Enter, Some(d)) if d.is_conditional() => {
                    in_conditional = true;
                }
                (WalkEvent::Exit, Some(d)) if d.is_conditional() => {
                    in_conditional = false;

                    // elif/else close the branch before them
                    if matches!(d, DirectiveKind::Elif | DirectiveKind::Else) {
                        flush_branch(file, &mut branches, &mut features, &mut branch_tags)?;
                    }

                    let kind = match d {
                        DirectiveKind::Elif => BranchKind::Elif,
                        DirectiveKind::Else => BranchKind::Else,
                        _ => BranchKind::If,
                    };
                    history.push(HistoryEntry {
                        kind,
                        condition: condition_text(tree, id, d),
                    });
                    let signature = build_signature(&history, self.config.signature_mode);
                    debug!(file, %signature, "opening branch");

                    if d.is_opener() {
                        blocks.push(Vec::new());
                    }
                    match blocks.last_mut() {
                        Some(block) => block.push((signature.clone(), id)),
                        None => return Err(AnalysisError::mismatch(file)),
                    }
                    branches.push(OpenBranch {
                        signature,
                        code: String::new(),
                        tags: Vec::new(),
                    });
                }
                (WalkEvent::Enter, Some(DirectiveKind::Endif)) => {
                    in_endif = true;
                }
                (WalkEvent::Exit, Some(DirectiveKind::Endif)) => {
                    in_endif = false;

                    flush_branch(file, &mut branches, &mut features, &mut branch_tags)?;

                    // one granularity record per branch of the closed block
                    let block = blocks.pop().ok_or_else(|| AnalysisError::mismatch(file))?;
                    for (signature, opener) in block {
                        outer_records.push(OuterRecord {
                            signature,
                            ancestor_path: tree.ancestor_tags(opener),
                            line: tree.line(opener),
                        });
                    }

                    // pop the history back past the matching opener
                    loop {
                        match history.pop() {
                            Some(entry) if entry.kind == BranchKind::If => break,
                            Some(_) => continue,
                            None => return Err(AnalysisError::mismatch(file)),
                        }
                    }
                }
                (WalkEvent::Exit, Some(DirectiveKind::Define)) => {
                    let text = tree.subtree_text(id);
                    if let Some(m) = parse_define(&text) {
                        registry.record_function_macro(&m.name);
                    }
                }
                _ => {}
            }

            if in_conditional || in_endif {
                continue;
            }

            // collect feature code and enclosed tags for the open branch
            if let Some(branch) = branches.last_mut() {
                match event {
                    WalkEvent::Enter => {
                        if let Some(text) = tree.text(id) {
                            branch.code.push_str(text);
                        }
                    }
                    WalkEvent::Exit => {
                        if let Some(tail) = tree.tail(id) {
                            branch.code.push_str(tail);
                        }
                    }
                }
                let is_conditional_tag = directive.is_some_and(DirectiveKind::is_conditional);
                if tree.ns(id) == Ns::Src || !is_conditional_tag {
                    branch.tags.push(TagRecord {
                        tag: tree.tag(id).to_string(),
                        event,
                        line: tree.line(id),
                    });
                }
            }
        }

        if !branches.is_empty() || !history.is_empty() {
            return Err(AnalysisError::mismatch(file));
        }

        if self.config.signature_mode == SignatureMode::Flat {
            features.retain(|sig, _| !sig.starts_with(ELSE_MARKER));
        }

        Ok(FileWalk {
            file: file.to_string(),
            features,
            branch_tags,
            outer_records,
            registry,
            loc: tree.end_line(),
        })
    }
}

fn flush_branch(
    file: &str,
    branches: &mut Vec<OpenBranch>,
    features: &mut FileFeatures,
    branch_tags: &mut Vec<(String, Vec<TagRecord>)>,
) -> Result<()> {
    let branch = branches.pop().ok_or_else(|| AnalysisError::mismatch(file))?;
    let depth = branches.len() + 1;

    let code = branch.code.replace("\n\n", "\n");
    let code = code.strip_prefix('\n').unwrap_or(&code).to_string();

    features
        .entry(branch.signature.clone())
        .and_modify(|entry| entry.codes.push(code.clone()))
        .or_insert_with(|| FeatureEntry {
            depth,
            codes: vec![code],
        });
    branch_tags.push((branch.signature, branch.tags));
    Ok(())
}

/// The verbatim condition of a directive: empty for `#else`, the macro name
/// for `#ifdef`/`#ifndef`, the flattened expression subtree for
/// `#if`/`#elif`.
pub(crate) fn raw_expression(tree: &SourceTree, id: NodeId) -> String {
    let children = tree.children(id);
    for &child in children {
        if matches!(tree.tag(child), "expr" | "name") {
            return tree.subtree_text(child).trim().to_string();
        }
    }
    // degenerate markup: a lone child whose tail carries the condition
    if let [only] = children {
        return tree.tail(*only).unwrap_or_default().trim().to_string();
    }
    String::new()
}

/// The condition a directive contributes to the signature algebra.
/// `#ifndef X` compiles its branch when `X` is not defined, so its
/// contribution is the negation of the written name.
pub(crate) fn condition_text(tree: &SourceTree, id: NodeId, kind: DirectiveKind) -> String {
    match kind {
        DirectiveKind::Else | DirectiveKind::Endif | DirectiveKind::Define => String::new(),
        DirectiveKind::Ifndef => format!("!({})", raw_expression(tree, id)),
        _ => raw_expression(tree, id),
    }
}

/// Compose a branch signature from the condition history by the
/// sign/negation rule.
fn build_signature(history: &[HistoryEntry], mode: SignatureMode) -> String {
    let mut negated = vec![false; history.len()];
    for (i, entry) in history.iter().enumerate() {
        if i > 0 && matches!(entry.kind, BranchKind::Elif | BranchKind::Else) {
            negated[i - 1] = true;
        }
    }

    let mut signature = String::new();
    for (i, entry) in history.iter().enumerate() {
        let mut name = entry.condition.clone();
        if negated[i] {
            name = match mode {
                SignatureMode::Expanded => format!("!({name})"),
                SignatureMode::Flat => format!("{ELSE_MARKER}!({name})"),
            };
        }
        if signature.is_empty() {
            signature = name;
            continue;
        }
        match entry.kind {
            BranchKind::Else => {}
            BranchKind::If | BranchKind::Elif => {
                signature = match mode {
                    SignatureMode::Expanded => format!("({signature}) && ({name})"),
                    SignatureMode::Flat => name,
                };
            }
        }
    }
    signature
}
