//! Integration tests for project-wide merging, scattering/tangling,
//! homogeneity, granularity, and report export.

mod common;

use std::fs::File;
use std::sync::Arc;

use common::*;
use vartex_analysis::merge::SignatureEquivalence;
use vartex_analysis::metrics::{scattering_degrees, tangling_degrees};
use vartex_analysis::output;
use vartex_analysis::VariabilityAnalysis;
use vartex_core::{AnalysisConfig, Ns, Result, SourceTree, TreeBuilder};

/// `#if A / #elif B / #else / #endif` with one statement per branch.
fn three_branch_file() -> SourceTree {
    let mut b = TreeBuilder::new();
    open_if(&mut b, "A", 1);
    b.tail("\na();\n");
    open_elif(&mut b, "B", 3);
    b.tail("\nb();\n");
    bare_directive(&mut b, "else", 5);
    b.tail("\nc();\n");
    bare_directive(&mut b, "endif", 7);
    b.finish()
}

fn guarded(name: &str, code: &str) -> SourceTree {
    let mut b = TreeBuilder::new();
    open_ifdef(&mut b, name, 1);
    b.tail(code);
    bare_directive(&mut b, "endif", 3);
    b.finish()
}

#[test]
fn scattering_and_tangling_degrees_match_the_sign_algebra_output() {
    let report = VariabilityAnalysis::new(AnalysisConfig::default())
        .analyze_project(&[("abc.c".to_string(), three_branch_file())]);

    // the walker produced exactly the documented signatures
    let sigs = report.features.raw_signatures();
    assert!(sigs.contains(&"A".to_string()));
    assert!(sigs.contains(&"(!(A)) && (B)".to_string()));
    assert!(sigs.contains(&"(!(A)) && (!(B))".to_string()));

    assert_eq!(report.scattering["A"], 3);
    assert_eq!(report.scattering["B"], 2);
    assert_eq!(report.tangling["A"], 1);
    assert_eq!(report.tangling["(!(A)) && (B)"], 2);
}

#[test]
fn degree_functions_work_on_plain_signature_lists() {
    let sigs = [
        "A".to_string(),
        "(!(A)) && (B)".to_string(),
        "(!(A)) && (!(B))".to_string(),
    ];
    let scattering = scattering_degrees(&sigs, ["A", "B"]);
    assert_eq!(scattering["A"], 3);
    assert_eq!(scattering["B"], 2);

    let tangling = tangling_degrees(&sigs, ["A", "B"]);
    assert_eq!(tangling["A"], 1);
    assert_eq!(tangling["(!(A)) && (!(B))"], 2);
}

#[test]
fn homogeneity_is_judged_across_files() {
    let files = vec![
        ("a.c".to_string(), guarded("HOM", "\nsame();\n")),
        ("b.c".to_string(), guarded("HOM", "\nsame();\n")),
        ("c.c".to_string(), guarded("HET", "\none();\n")),
        ("d.c".to_string(), guarded("HET", "\ntwo();\n")),
        ("e.c".to_string(), guarded("MIX", "\ndup();\n")),
        ("f.c".to_string(), guarded("MIX", "\ndup();\n")),
        ("g.c".to_string(), guarded("MIX", "\nother();\n")),
    ];
    let report = VariabilityAnalysis::new(AnalysisConfig::default()).analyze_project(&files);

    assert_eq!(report.homogeneity.homogeneous, 1);
    assert_eq!(report.homogeneity.heterogeneous, 1);
    assert_eq!(report.homogeneity.mixed, 1);
}

#[test]
fn feature_kinds_follow_signature_connectives() {
    let mut b = TreeBuilder::new();
    open_if(&mut b, "A || B", 1);
    b.tail("\nshared();\n");
    bare_directive(&mut b, "endif", 3);
    b.tail("\n");
    open_if(&mut b, "C && D", 4);
    b.tail("\nderived();\n");
    bare_directive(&mut b, "endif", 6);
    let tree = b.finish();

    let report = VariabilityAnalysis::new(AnalysisConfig::default())
        .analyze_project(&[("kinds.c".to_string(), tree)]);
    assert_eq!(report.kinds.shared, 1);
    assert_eq!(report.kinds.derivative, 1);
    assert_eq!(report.kinds.combined, 0);
}

#[test]
fn merge_with_itself_is_idempotent_on_canonical_keys() {
    let files = vec![
        ("a.c".to_string(), three_branch_file()),
        ("b.c".to_string(), three_branch_file()),
    ];
    let once =
        VariabilityAnalysis::new(AnalysisConfig::default()).analyze_project(&files[..1]);
    let twice = VariabilityAnalysis::new(AnalysisConfig::default()).analyze_project(&files);

    let keys_once: Vec<&String> = once.features.entries.keys().collect();
    let keys_twice: Vec<&String> = twice.features.entries.keys().collect();
    assert_eq!(keys_once, keys_twice, "no new canonical keys");

    for (key, entry) in &twice.features.entries {
        let single = &once.features.entries[key];
        assert_eq!(entry.depth, single.depth);
        assert_eq!(entry.codes.len(), single.codes.len() * 2);
    }
}

#[test]
fn granularity_histogram_distinguishes_scopes() {
    // one #ifdef at unit scope, one inside a function body
    let mut b = TreeBuilder::new();
    open_ifdef(&mut b, "TOP", 1);
    b.tail("\nint g;\n");
    bare_directive(&mut b, "endif", 3);
    b.tail("\n");
    b.open(Ns::Src, "function", 4);
    b.text("void f() ");
    b.open(Ns::Src, "block", 4);
    b.text("{\n");
    open_ifdef(&mut b, "INNER", 5);
    b.tail("\nx();\n");
    bare_directive(&mut b, "endif", 7);
    b.tail("\n");
    b.close();
    b.tail("}\n");
    b.close();
    let tree = b.finish();

    let report = VariabilityAnalysis::new(AnalysisConfig::default())
        .analyze_project(&[("scopes.c".to_string(), tree)]);
    assert_eq!(report.granularity.compilation_unit, 1);
    assert_eq!(report.granularity.function, 1);
    assert_eq!(report.granularity.errors, 0);
}

#[test]
fn unknown_granularity_paths_are_counted_not_dropped() {
    let mut b = TreeBuilder::new();
    b.open(Ns::Src, "mystery", 1);
    open_ifdef(&mut b, "X", 2);
    b.tail("\nx();\n");
    bare_directive(&mut b, "endif", 4);
    b.close();
    let tree = b.finish();

    let report = VariabilityAnalysis::new(AnalysisConfig::default())
        .analyze_project(&[("odd.c".to_string(), tree)]);
    assert_eq!(report.granularity.errors, 1);
}

#[test]
fn injected_equivalence_oracle_controls_merging() {
    /// Treats every pair of non-empty signatures as equivalent.
    struct AlwaysEqual;
    impl SignatureEquivalence for AlwaysEqual {
        fn equivalent(&self, canonical: &str, candidate: &str) -> Result<bool> {
            Ok(!canonical.is_empty() && !candidate.is_empty())
        }
    }

    let files = vec![
        ("a.c".to_string(), guarded("ONE", "\nx();\n")),
        ("b.c".to_string(), guarded("TWO", "\ny();\n")),
    ];
    let report = VariabilityAnalysis::with_equivalence(
        AnalysisConfig::default(),
        Arc::new(AlwaysEqual),
    )
    .analyze_project(&files);

    assert_eq!(report.features.len(), 1, "oracle collapsed everything");
    let entry = report.features.entries.values().next().unwrap();
    assert_eq!(entry.variants, vec!["ONE".to_string(), "TWO".to_string()]);
}

#[test]
fn reports_serialize_and_export_to_csv() {
    let report = VariabilityAnalysis::new(AnalysisConfig::default())
        .analyze_project(&[("abc.c".to_string(), three_branch_file())]);

    let mut json = Vec::new();
    output::write_json_report(&mut json, &report).unwrap();
    let json = String::from_utf8(json).unwrap();
    assert!(json.contains("\"scattering\""));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scattering.csv");
    output::write_scattering_degrees(File::create(&path).unwrap(), &report.scattering).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("define,SD\n"));
    assert!(text.contains("A,3"));

    let mut buf = Vec::new();
    output::write_file_stats(&mut buf, &report).unwrap();
    let stats = String::from_utf8(buf).unwrap();
    assert!(stats.starts_with("FILENAME,LOC,LOF,NOFC,"));
    assert!(stats.contains("abc.c"));

    let mut buf = Vec::new();
    output::write_branch_nesting(&mut buf, &report.branch_nesting).unwrap();
    let nesting = String::from_utf8(buf).unwrap();
    assert_eq!(nesting.lines().count(), 1 + report.branch_nesting.len());
}

#[test]
fn loc_is_the_last_line_of_the_file() {
    let report = VariabilityAnalysis::new(AnalysisConfig::default())
        .analyze_project(&[("abc.c".to_string(), three_branch_file())]);
    assert_eq!(report.files[0].loc, 7);
}
