//! Feature-level classifications and statistics.

use serde::{Deserialize, Serialize};

use super::{mean, std_dev};

/// Shape of a feature signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Contains `||` but no `&&`: code shared between alternatives.
    Shared,
    /// Contains `&&` but no `||`: a derivative of several features.
    Derivative,
    /// Contains both.
    Combined,
}

/// Classify a signature by its boolean connectives. Signatures with neither
/// connective are plain single-feature conditions and stay unclassified.
pub fn classify_kind(signature: &str) -> Option<FeatureKind> {
    let or = signature.contains("||");
    let and = signature.contains("&&");
    match (or, and) {
        (true, false) => Some(FeatureKind::Shared),
        (false, true) => Some(FeatureKind::Derivative),
        (true, true) => Some(FeatureKind::Combined),
        (false, false) => None,
    }
}

/// Counts of signature kinds over a merged feature map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub shared: usize,
    pub derivative: usize,
    pub combined: usize,
}

impl KindCounts {
    pub fn record(&mut self, kind: Option<FeatureKind>) {
        match kind {
            Some(FeatureKind::Shared) => self.shared += 1,
            Some(FeatureKind::Derivative) => self.derivative += 1,
            Some(FeatureKind::Combined) => self.combined += 1,
            None => {}
        }
    }
}

/// How the code fragments mapped to one signature relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeHomogeneity {
    /// At least two fragments, all identical.
    Homogeneous,
    /// All fragments distinct.
    Heterogeneous,
    /// Duplicates exist alongside distinct fragments.
    Mixed,
}

/// Classify a feature's code fragments.
///
/// # Examples
///
/// ```
/// use vartex_analysis::metrics::{classify_homogeneity, CodeHomogeneity};
///
/// let frags = ["x;".to_string(), "x;".to_string(), "y;".to_string()];
/// assert_eq!(classify_homogeneity(&frags), CodeHomogeneity::Mixed);
/// ```
pub fn classify_homogeneity(codes: &[String]) -> CodeHomogeneity {
    let mut distinct: Vec<&String> = codes.iter().collect();
    distinct.sort();
    distinct.dedup();

    if distinct.len() == 1 && codes.len() > 1 {
        CodeHomogeneity::Homogeneous
    } else if distinct.len() == codes.len() {
        CodeHomogeneity::Heterogeneous
    } else {
        CodeHomogeneity::Mixed
    }
}

/// Counts of homogeneity classes over a merged feature map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomogeneityCounts {
    pub homogeneous: usize,
    pub heterogeneous: usize,
    pub mixed: usize,
}

impl HomogeneityCounts {
    pub fn record(&mut self, class: CodeHomogeneity) {
        match class {
            CodeHomogeneity::Homogeneous => self.homogeneous += 1,
            CodeHomogeneity::Heterogeneous => self.heterogeneous += 1,
            CodeHomogeneity::Mixed => self.mixed += 1,
        }
    }
}

/// Line statistics over feature-code fragments. A fragment's line count is
/// the number of newlines it contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentLineStats {
    pub fragments: usize,
    pub total_lines: usize,
    pub min_lines: usize,
    pub max_lines: usize,
    pub mean_lines: f64,
    pub std_dev_lines: f64,
}

/// Summarize fragment line counts.
pub fn fragment_line_stats<'a>(codes: impl IntoIterator<Item = &'a String>) -> FragmentLineStats {
    let lines: Vec<usize> = codes
        .into_iter()
        .map(|c| c.matches('\n').count())
        .collect();
    if lines.is_empty() {
        return FragmentLineStats::default();
    }
    let as_f64: Vec<f64> = lines.iter().map(|&v| v as f64).collect();
    FragmentLineStats {
        fragments: lines.len(),
        total_lines: lines.iter().sum(),
        min_lines: *lines.iter().min().unwrap(),
        max_lines: *lines.iter().max().unwrap(),
        mean_lines: mean(&as_f64),
        std_dev_lines: std_dev(&as_f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn kind_classification_follows_connectives() {
        assert_eq!(classify_kind("A || B"), Some(FeatureKind::Shared));
        assert_eq!(
            classify_kind("(!(A)) && (B)"),
            Some(FeatureKind::Derivative)
        );
        assert_eq!(classify_kind("A && (B || C)"), Some(FeatureKind::Combined));
        assert_eq!(classify_kind("A"), None);
    }

    #[test]
    fn homogeneity_classes() {
        assert_eq!(
            classify_homogeneity(&strings(&["x;", "x;"])),
            CodeHomogeneity::Homogeneous
        );
        assert_eq!(
            classify_homogeneity(&strings(&["x;", "y;"])),
            CodeHomogeneity::Heterogeneous
        );
        assert_eq!(
            classify_homogeneity(&strings(&["x;", "x;", "y;"])),
            CodeHomogeneity::Mixed
        );
        // a lone fragment has no duplicates: heterogeneous
        assert_eq!(
            classify_homogeneity(&strings(&["x;"])),
            CodeHomogeneity::Heterogeneous
        );
    }

    #[test]
    fn fragment_stats() {
        let codes = strings(&["a;\nb;\n", "c;\n", ""]);
        let stats = fragment_line_stats(codes.iter());
        assert_eq!(stats.fragments, 3);
        assert_eq!(stats.total_lines, 3);
        assert_eq!(stats.min_lines, 0);
        assert_eq!(stats.max_lines, 2);
        assert!((stats.mean_lines - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let stats = fragment_line_stats(std::iter::empty());
        assert_eq!(stats.fragments, 0);
        assert_eq!(stats.max_lines, 0);
    }
}
