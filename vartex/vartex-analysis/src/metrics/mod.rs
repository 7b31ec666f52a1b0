//! Variability metrics.
//!
//! Pure functions over the walker's and merger's outputs:
//! - [`nesting`] - nesting-depth distributions per file and per top-level branch
//! - [`scattering`] - scattering and tangling degrees of feature constants
//! - [`features`] - feature kind, code homogeneity, and fragment statistics
//! - [`granularity`] - syntactic scope of each conditional branch

pub mod features;
pub mod granularity;
pub mod nesting;
pub mod scattering;

pub use features::{
    classify_homogeneity, classify_kind, fragment_line_stats, CodeHomogeneity, FeatureKind,
    FragmentLineStats, HomogeneityCounts, KindCounts,
};
pub use granularity::{
    classify_inner, classify_outer, GranularityHistogram, InnerCounts, InnerGranularity,
    OuterGranularity,
};
pub use nesting::{nesting_depths, BranchNesting, FileNesting};
pub use scattering::{scattering_degrees, tangling_degrees};

use serde::{Deserialize, Serialize};

/// Mean and population standard deviation of a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std_dev: f64,
}

impl MeanStd {
    /// Summarize a list of counts. Empty input yields zeros.
    pub fn from_counts(values: impl IntoIterator<Item = usize>) -> Self {
        let values: Vec<f64> = values.into_iter().map(|v| v as f64).collect();
        Self {
            mean: mean(&values),
            std_dev: std_dev(&values),
        }
    }
}

/// Max, mean, and population standard deviation of a level distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub max: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl DistributionSummary {
    pub fn from_levels(levels: &[usize]) -> Self {
        let values: Vec<f64> = levels.iter().map(|&v| v as f64).collect();
        Self {
            max: levels.iter().copied().max().unwrap_or(0),
            mean: mean(&values),
            std_dev: std_dev(&values),
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; zero for fewer than two samples.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
