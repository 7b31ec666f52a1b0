//! Batch analysis: per-file fan-out, project-wide fan-in.
//!
//! Per-file walks are independent CPU-bound passes over materialized trees,
//! so the batch fans out with rayon and merges strictly afterwards. A file
//! with unbalanced directives is skipped (and reported); nothing aborts the
//! batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vartex_core::{AnalysisConfig, Result, SourceTree};

use crate::expr::ExpressionParser;
use crate::macros::MacroRegistry;
use crate::merge::{ProjectFeatures, SignatureEquivalence, SignatureMerger, TextualEquivalence};
use crate::metrics::{
    classify_homogeneity, classify_inner, classify_kind, classify_outer, fragment_line_stats,
    nesting_depths, BranchNesting, DistributionSummary, FileNesting, FragmentLineStats,
    GranularityHistogram, HomogeneityCounts, InnerCounts, KindCounts, MeanStd,
};
use crate::walker::{ConditionalBlockWalker, FileWalk};

/// The outputs of one file's analysis passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub walk: FileWalk,
    pub nesting: FileNesting,
}

/// Per-file row of the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    /// Line of the last element in the file.
    pub loc: usize,
    /// Lines of feature code in this file.
    pub feature_lines: usize,
    /// Object-like feature constants referenced by this file's conditions.
    pub feature_constants: usize,
    pub nesting: DistributionSummary,
    pub granularity: GranularityHistogram,
}

/// Project-wide report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectReport {
    pub files: Vec<FileReport>,
    /// Files skipped for unbalanced directives.
    pub skipped_files: Vec<String>,

    pub features: ProjectFeatures,
    pub registry: MacroRegistry,

    /// Feature constant → number of distinct signatures mentioning it.
    pub scattering: BTreeMap<String, usize>,
    /// Signature → number of feature constants it mentions.
    pub tangling: BTreeMap<String, usize>,
    pub scattering_summary: MeanStd,
    pub tangling_summary: MeanStd,

    /// Nesting levels over all files.
    pub nesting: DistributionSummary,
    /// Per top-level branch: deepest nesting reached inside it.
    pub branch_nesting: Vec<BranchNesting>,

    pub kinds: KindCounts,
    pub homogeneity: HomogeneityCounts,
    pub granularity: GranularityHistogram,
    pub inner_granularity: InnerCounts,
    pub fragment_lines: FragmentLineStats,

    /// Mean/std-dev of the number of files referencing each constant.
    pub files_per_constant: MeanStd,
    /// Project-wide object-like feature constant count.
    pub feature_constants: usize,
    /// Signatures that fell back to raw text during normalization.
    pub parse_failures: usize,
}

/// Facade wiring walker, merger, and metrics together for a whole run.
///
/// One instance fixes one [`AnalysisConfig`] (and thus one signature mode)
/// and one equivalence predicate for everything it analyzes.
///
/// # Examples
///
/// ```
/// use vartex_analysis::VariabilityAnalysis;
/// use vartex_core::{AnalysisConfig, Ns, TreeBuilder};
///
/// let mut b = TreeBuilder::new();
/// b.open(Ns::Cpp, "ifdef", 1);
/// b.leaf(Ns::Cpp, "directive", 1, Some("ifdef"), Some(" "));
/// b.leaf(Ns::Src, "name", 1, Some("FEATURE"), None);
/// b.close();
/// b.tail("\nint x;\n");
/// b.open(Ns::Cpp, "endif", 3);
/// b.close();
/// let tree = b.finish();
///
/// let analysis = VariabilityAnalysis::new(AnalysisConfig::default());
/// let report = analysis.analyze_project(&[("a.c".to_string(), tree)]);
/// assert_eq!(report.features.len(), 1);
/// assert_eq!(report.scattering["FEATURE"], 1);
/// ```
pub struct VariabilityAnalysis {
    config: AnalysisConfig,
    equivalence: Arc<dyn SignatureEquivalence>,
}

impl VariabilityAnalysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            equivalence: Arc::new(TextualEquivalence),
        }
    }

    /// Replace the default textual equivalence with an injected predicate.
    pub fn with_equivalence(
        config: AnalysisConfig,
        equivalence: Arc<dyn SignatureEquivalence>,
    ) -> Self {
        Self {
            config,
            equivalence,
        }
    }

    /// Run the per-file passes: conditional-block extraction and nesting.
    pub fn analyze_file(&self, file: &str, tree: &SourceTree) -> Result<FileAnalysis> {
        let walk = ConditionalBlockWalker::new(self.config.clone()).walk(file, tree)?;
        let nesting = nesting_depths(file, tree);
        Ok(FileAnalysis { walk, nesting })
    }

    /// Analyze a whole project: fan out per-file walks, then merge.
    pub fn analyze_project(&self, files: &[(String, SourceTree)]) -> ProjectReport {
        let results: Vec<(String, Result<FileAnalysis>)> = files
            .par_iter()
            .map(|(file, tree)| (file.clone(), self.analyze_file(file, tree)))
            .collect();

        self.merge_results(results)
    }

    fn merge_results(&self, results: Vec<(String, Result<FileAnalysis>)>) -> ProjectReport {
        let parser = ExpressionParser::new(self.config.max_expression_depth);
        let mut merger = SignatureMerger::new(parser, self.equivalence.clone());
        let mut registry = MacroRegistry::new();

        let mut file_reports = Vec::new();
        let mut skipped_files = Vec::new();
        let mut all_levels: Vec<usize> = Vec::new();
        let mut branch_nesting = Vec::new();
        let mut granularity = GranularityHistogram::default();
        let mut inner_granularity = InnerCounts::default();

        for (file, result) in results {
            let analysis = match result {
                Ok(analysis) => analysis,
                Err(err) => {
                    warn!(%file, %err, "skipping file");
                    skipped_files.push(file);
                    continue;
                }
            };

            registry.merge(&analysis.walk.registry);
            merger.merge_file(&file, &analysis.walk.features, &mut registry);

            let mut file_granularity = GranularityHistogram::default();
            for record in &analysis.walk.outer_records {
                match classify_outer(&record.ancestor_path, record.line) {
                    Ok(Some(scope)) => file_granularity.count(scope),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(%file, %err, "granularity not recognized");
                        file_granularity.errors += 1;
                    }
                }
            }
            granularity.merge(&file_granularity);

            for (_, tags) in &analysis.walk.branch_tags {
                inner_granularity.merge(&classify_inner(tags));
            }

            let feature_lines: usize = analysis
                .walk
                .features
                .values()
                .flat_map(|entry| entry.codes.iter())
                .map(|code| code.matches('\n').count())
                .sum();

            file_reports.push(FileReport {
                loc: analysis.walk.loc,
                feature_lines,
                // this file was merged above, so its references are known
                feature_constants: registry.object_macro_count_for(&file),
                nesting: DistributionSummary::from_levels(&analysis.nesting.levels),
                granularity: file_granularity,
                file,
            });

            all_levels.extend(analysis.nesting.levels);
            branch_nesting.extend(analysis.nesting.branches);
        }

        let parse_failures = merger.parse_failures();
        let features = merger.finish();

        let raw_signatures = features.raw_signatures();
        let defines: Vec<&String> = registry.defined_macros().iter().collect();
        let scattering = crate::metrics::scattering_degrees(&raw_signatures, defines.clone());
        let tangling = crate::metrics::tangling_degrees(&raw_signatures, defines);
        let scattering_summary = MeanStd::from_counts(scattering.values().copied());
        let tangling_summary = MeanStd::from_counts(tangling.values().copied());

        let mut kinds = KindCounts::default();
        let mut homogeneity = HomogeneityCounts::default();
        for feature in features.entries.values() {
            // kinds are judged on the first raw spelling, the one written
            // in the source
            if let Some(first) = feature.variants.first() {
                kinds.record(classify_kind(first));
            }
            homogeneity.record(classify_homogeneity(&feature.codes));
        }

        let fragment_lines =
            fragment_line_stats(features.entries.values().flat_map(|f| f.codes.iter()));
        let files_per_constant =
            MeanStd::from_counts(registry.files_per_constant().values().copied());
        let feature_constants = registry.object_macro_count();

        info!(
            files = file_reports.len(),
            skipped = skipped_files.len(),
            features = features.len(),
            "project analysis finished"
        );

        ProjectReport {
            files: file_reports,
            skipped_files,
            scattering,
            tangling,
            scattering_summary,
            tangling_summary,
            nesting: DistributionSummary::from_levels(&all_levels),
            branch_nesting,
            kinds,
            homogeneity,
            granularity,
            inner_granularity,
            fragment_lines,
            files_per_constant,
            feature_constants,
            parse_failures,
            features,
            registry,
        }
    }
}
