//! Project-wide signature merging.
//!
//! Per-file feature maps use whatever signature text the walker composed.
//! Across files the same condition can be written in many spellings, so each
//! raw signature is normalized and then matched against the already-known
//! canonical signatures with a pluggable equivalence predicate. The default
//! predicate is exact string equality on the normalized forms; a semantic
//! oracle can be injected without changing any caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vartex_core::Result;

use crate::expr::ExpressionParser;
use crate::macros::MacroRegistry;
use crate::walker::{FeatureEntry, FileFeatures};

/// Decides whether a candidate signature means the same condition as an
/// existing canonical signature.
///
/// Implementations may consult external oracles; an `Err` is treated by the
/// merger as "no match", never as a batch failure.
pub trait SignatureEquivalence: Send + Sync {
    fn equivalent(&self, canonical: &str, candidate: &str) -> Result<bool>;
}

/// Default equivalence: exact equality of non-empty normalized signatures.
/// Empty signatures never match anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextualEquivalence;

impl SignatureEquivalence for TextualEquivalence {
    fn equivalent(&self, canonical: &str, candidate: &str) -> Result<bool> {
        Ok(!canonical.is_empty() && !candidate.is_empty() && canonical == candidate)
    }
}

/// One merged feature: minimal depth over all occurrences, every code
/// fragment, and the raw signature spellings collapsed into this entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedFeature {
    pub depth: usize,
    pub codes: Vec<String>,
    /// Raw signature variants, in merge order. The first variant is the
    /// spelling that created the entry.
    pub variants: Vec<String>,
}

/// The project-wide feature map, keyed by canonical (normalized) signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFeatures {
    pub entries: BTreeMap<String, MergedFeature>,
}

impl ProjectFeatures {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All distinct raw signature spellings across all entries.
    pub fn raw_signatures(&self) -> Vec<String> {
        let mut sigs: Vec<String> = self
            .entries
            .values()
            .flat_map(|f| f.variants.iter().cloned())
            .collect();
        sigs.sort();
        sigs.dedup();
        sigs
    }
}

/// Accumulates per-file feature maps into a [`ProjectFeatures`].
pub struct SignatureMerger {
    parser: ExpressionParser,
    equivalence: Arc<dyn SignatureEquivalence>,
    features: ProjectFeatures,
    parse_failures: usize,
}

impl SignatureMerger {
    pub fn new(parser: ExpressionParser, equivalence: Arc<dyn SignatureEquivalence>) -> Self {
        Self {
            parser,
            equivalence,
            features: ProjectFeatures::default(),
            parse_failures: 0,
        }
    }

    /// Merge one file's feature map. Identifiers referenced by the
    /// signatures are recorded in `registry` as feature constants of `file`.
    pub fn merge_file(&mut self, file: &str, features: &FileFeatures, registry: &mut MacroRegistry) {
        for (signature, entry) in features {
            self.merge_one(file, signature, entry, registry);
        }
    }

    fn merge_one(
        &mut self,
        file: &str,
        signature: &str,
        entry: &FeatureEntry,
        registry: &mut MacroRegistry,
    ) {
        let (parsed, failed) = self.parser.parse_lossy(signature);
        if failed {
            self.parse_failures += 1;
        }
        for ident in &parsed.identifiers {
            registry.record_reference(file, ident);
        }

        let matched = self
            .features
            .entries
            .keys()
            .find(|canonical| {
                self.equivalence
                    .equivalent(canonical, &parsed.normalized)
                    .unwrap_or_else(|err| {
                        warn!(%err, %canonical, "equivalence oracle failed, treating as no match");
                        false
                    })
            })
            .cloned();

        match matched {
            Some(canonical) => {
                let merged = self
                    .features
                    .entries
                    .get_mut(&canonical)
                    .expect("matched key exists");
                merged.depth = merged.depth.min(entry.depth);
                merged.codes.extend(entry.codes.iter().cloned());
                merged.variants.push(signature.to_string());
                debug!(%canonical, variant = signature, "merged signature variant");
            }
            None => {
                let merged = self
                    .features
                    .entries
                    .entry(parsed.normalized.clone())
                    .or_insert_with(|| MergedFeature {
                        depth: entry.depth,
                        ..MergedFeature::default()
                    });
                merged.depth = merged.depth.min(entry.depth);
                merged.codes.extend(entry.codes.iter().cloned());
                merged.variants.push(signature.to_string());
            }
        }
    }

    /// Number of signatures that fell back to their raw text.
    pub fn parse_failures(&self) -> usize {
        self.parse_failures
    }

    /// Finish merging and return the project-wide feature map.
    pub fn finish(self) -> ProjectFeatures {
        self.features
    }
}
