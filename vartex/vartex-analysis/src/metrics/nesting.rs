//! Nesting-depth metrics.
//!
//! Two views over one document-order pass:
//! 1. per file, the nesting level sampled at every block opener
//!    (`#if`/`#ifdef`/`#ifndef`), and
//! 2. per top-level branch, the deepest nesting reached anywhere inside it
//!    before its sibling directive or `#endif` closes it.
//!
//! `#else` branches have no written condition, so their top-level record
//! gets a synthesized signature: the conjunction of the negations of every
//! earlier branch condition in the block.

use serde::{Deserialize, Serialize};
use vartex_core::{DirectiveKind, SourceTree, WalkEvent};

use crate::walker::condition_text;

/// Maximum nesting reached inside one top-level branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchNesting {
    pub file: String,
    pub signature: String,
    pub max_depth: usize,
}

/// Per-file nesting data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileNesting {
    /// Nesting level at each block opener, in document order.
    pub levels: Vec<usize>,
    /// One record per top-level branch, in document order.
    pub branches: Vec<BranchNesting>,
}

/// Sample nesting depths for one file.
///
/// Intended for well-formed trees (the walker has already rejected
/// unbalanced files); a stray closer is clamped rather than underflowing.
pub fn nesting_depths(file: &str, tree: &SourceTree) -> FileNesting {
    let mut current: usize = 0;
    let mut block_max: usize = 0;

    let mut levels = Vec::new();
    let mut block: Vec<BranchNesting> = Vec::new();
    let mut branches = Vec::new();

    for (event, id) in tree.events() {
        if event != WalkEvent::Enter {
            continue;
        }
        let Some(directive) = tree.directive(id) else {
            continue;
        };

        if directive.is_branch_end() {
            current = current.saturating_sub(1);
            if current == 0 {
                if let Some(last) = block.last_mut() {
                    last.max_depth = block_max;
                }
                block_max = 0;
                if directive == DirectiveKind::Endif {
                    branches.append(&mut block);
                }
            }
        }

        if directive.is_conditional() {
            current += 1;
            if directive.is_opener() {
                levels.push(current);
            }
            if current == 1 {
                let signature = if directive == DirectiveKind::Else {
                    block
                        .iter()
                        .map(|b| format!("!({})", b.signature))
                        .collect::<Vec<_>>()
                        .join(" && ")
                } else {
                    condition_text(tree, id, directive)
                };
                block.push(BranchNesting {
                    file: file.to_string(),
                    signature,
                    max_depth: 0,
                });
            }
            block_max = block_max.max(current);
        }
    }

    FileNesting { levels, branches }
}
