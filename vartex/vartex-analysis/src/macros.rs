//! Registry of feature constants and function-like macros.
//!
//! Two sources feed the registry: identifiers referenced by parsed condition
//! expressions (the feature constants a project varies on), and
//! function-like `#define`s found by the walker. Function-macro names are
//! kept separately so they can be excluded when counting object-like feature
//! constants.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Macro bookkeeping for one run. Cheap to create per file and merge at
/// fan-in; persists for a whole batch and is reset between runs by dropping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MacroRegistry {
    /// All referenced feature constants, project-wide.
    defined_macros: BTreeSet<String>,
    /// Referenced feature constants per file.
    per_file: BTreeMap<String, BTreeSet<String>>,
    /// Names of function-like macros from `#define NAME(args) …`.
    function_macros: BTreeSet<String>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identifier referenced by a condition in `file`.
    pub fn record_reference(&mut self, file: &str, ident: &str) {
        if ident.is_empty() {
            return;
        }
        self.defined_macros.insert(ident.to_string());
        self.per_file
            .entry(file.to_string())
            .or_default()
            .insert(ident.to_string());
    }

    /// Record a function-like macro definition.
    pub fn record_function_macro(&mut self, name: &str) {
        self.function_macros.insert(name.to_string());
    }

    /// Merge another registry (e.g. a per-file delta) into this one.
    pub fn merge(&mut self, other: &MacroRegistry) {
        self.defined_macros
            .extend(other.defined_macros.iter().cloned());
        for (file, set) in &other.per_file {
            self.per_file
                .entry(file.clone())
                .or_default()
                .extend(set.iter().cloned());
        }
        self.function_macros
            .extend(other.function_macros.iter().cloned());
    }

    /// All referenced feature constants.
    pub fn defined_macros(&self) -> &BTreeSet<String> {
        &self.defined_macros
    }

    /// Function-like macro names.
    pub fn function_macros(&self) -> &BTreeSet<String> {
        &self.function_macros
    }

    /// Project-wide count of object-like feature constants: everything
    /// referenced that is not a function-like macro.
    pub fn object_macro_count(&self) -> usize {
        self.defined_macros
            .iter()
            .filter(|m| !self.function_macros.contains(*m))
            .count()
    }

    /// Object-like feature-constant count for one file.
    pub fn object_macro_count_for(&self, file: &str) -> usize {
        self.per_file
            .get(file)
            .map(|set| {
                set.iter()
                    .filter(|m| !self.function_macros.contains(*m))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Invert the per-file map: for every feature constant, the number of
    /// files referencing it.
    pub fn files_per_constant(&self) -> BTreeMap<String, usize> {
        let mut inv: BTreeMap<String, usize> = BTreeMap::new();
        for set in self.per_file.values() {
            for m in set {
                *inv.entry(m.clone()).or_default() += 1;
            }
        }
        inv
    }
}
