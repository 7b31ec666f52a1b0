//! Integration tests for conditional-block extraction: directive balance,
//! the sign/negation signature algebra, nesting, and signature modes.

mod common;

use common::*;
use vartex_analysis::metrics::nesting_depths;
use vartex_analysis::walker::ConditionalBlockWalker;
use vartex_core::{AnalysisConfig, AnalysisError, SignatureMode, TreeBuilder};

fn walker() -> ConditionalBlockWalker {
    ConditionalBlockWalker::new(AnalysisConfig::default())
}

#[test]
fn well_formed_nesting_leaves_no_open_blocks() {
    // #if A { #ifdef B #endif } #elif C #else #endif
    let mut b = TreeBuilder::new();
    open_if(&mut b, "A", 1);
    b.tail("\na();\n");
    open_ifdef(&mut b, "B", 3);
    b.tail("\nb();\n");
    bare_directive(&mut b, "endif", 5);
    b.tail("\n");
    open_elif(&mut b, "C", 6);
    b.tail("\nc();\n");
    bare_directive(&mut b, "else", 8);
    b.tail("\nd();\n");
    bare_directive(&mut b, "endif", 10);
    let tree = b.finish();

    let result = walker().walk("balanced.c", &tree).unwrap();
    // four branches were flushed overall
    assert_eq!(result.branch_tags.len(), 4);
}

#[test]
fn extra_opener_fails_with_structural_error() {
    let mut b = TreeBuilder::new();
    open_ifdef(&mut b, "A", 1);
    b.tail("\nx();\n");
    open_ifdef(&mut b, "B", 3);
    b.tail("\ny();\n");
    bare_directive(&mut b, "endif", 5);
    let tree = b.finish();

    let err = walker().walk("unbalanced.c", &tree).unwrap_err();
    assert!(matches!(err, AnalysisError::IfdefEndifMismatch { .. }));
}

#[test]
fn missing_opener_fails_with_structural_error() {
    let mut b = TreeBuilder::new();
    open_ifdef(&mut b, "A", 1);
    b.tail("\nx();\n");
    bare_directive(&mut b, "endif", 3);
    b.tail("\n");
    bare_directive(&mut b, "endif", 4);
    let tree = b.finish();

    let err = walker().walk("unbalanced.c", &tree).unwrap_err();
    assert!(matches!(err, AnalysisError::IfdefEndifMismatch { .. }));
}

#[test]
fn sign_algebra_produces_the_three_expected_signatures() {
    // #if A / #elif B / #else / #endif
    let mut b = TreeBuilder::new();
    open_if(&mut b, "A", 1);
    b.tail("\na();\n");
    open_elif(&mut b, "B", 3);
    b.tail("\nb();\n");
    bare_directive(&mut b, "else", 5);
    b.tail("\nc();\n");
    bare_directive(&mut b, "endif", 7);
    let tree = b.finish();

    let result = walker().walk("abc.c", &tree).unwrap();
    let signatures: Vec<&String> = result.features.keys().collect();
    assert!(signatures.contains(&&"A".to_string()));
    assert!(signatures.contains(&&"(!(A)) && (B)".to_string()));
    assert!(signatures.contains(&&"(!(A)) && (!(B))".to_string()));
    assert_eq!(signatures.len(), 3);
}

#[test]
fn signatures_are_fixed_before_code_accumulates() {
    let mut b = TreeBuilder::new();
    open_if(&mut b, "A > 2", 1);
    b.tail("\nfirst();\nsecond();\n");
    bare_directive(&mut b, "endif", 4);
    let tree = b.finish();

    let result = walker().walk("single.c", &tree).unwrap();
    let entry = &result.features["A > 2"];
    assert_eq!(entry.depth, 1);
    assert_eq!(entry.codes, vec!["first();\nsecond();\n".to_string()]);
}

#[test]
fn nesting_levels_match_the_fully_nested_example() {
    // #if X { #if Y #endif } #endif
    let mut b = TreeBuilder::new();
    open_if(&mut b, "X", 1);
    b.tail("\n");
    open_if(&mut b, "Y", 2);
    b.tail("\ny();\n");
    bare_directive(&mut b, "endif", 4);
    b.tail("\n");
    bare_directive(&mut b, "endif", 5);
    let tree = b.finish();

    let nesting = nesting_depths("nested.c", &tree);
    assert_eq!(nesting.levels, vec![1, 2]);
    assert_eq!(*nesting.levels.iter().max().unwrap(), 2);
    let mean = nesting.levels.iter().sum::<usize>() as f64 / nesting.levels.len() as f64;
    assert!((mean - 1.5).abs() < 1e-9);
}

#[test]
fn ifndef_guard_negates_its_condition() {
    let mut b = TreeBuilder::new();
    open_ifndef(&mut b, "HEADER_H", 1);
    b.tail("\ncontent();\n");
    bare_directive(&mut b, "endif", 3);
    let tree = b.finish();

    let result = walker().walk("guard.h", &tree).unwrap();
    assert!(result.features.contains_key("!(HEADER_H)"));
}

#[test]
fn flat_mode_keeps_local_conditions_only() {
    let mut b = TreeBuilder::new();
    open_if(&mut b, "A", 1);
    b.tail("\n");
    open_if(&mut b, "B", 2);
    b.tail("\nnested();\n");
    bare_directive(&mut b, "endif", 4);
    b.tail("\n");
    bare_directive(&mut b, "endif", 5);
    let tree = b.finish();

    let config = AnalysisConfig {
        signature_mode: SignatureMode::Flat,
        ..AnalysisConfig::default()
    };
    let result = ConditionalBlockWalker::new(config)
        .walk("flat.c", &tree)
        .unwrap();
    assert!(result.features.contains_key("A"));
    assert!(
        result.features.contains_key("B"),
        "flat mode keeps the inner condition unconjoined"
    );
    assert!(!result.features.keys().any(|sig| sig.contains("&&")));
}

#[test]
fn defines_inside_branches_are_code_and_function_macros_are_registered() {
    let mut b = TreeBuilder::new();
    open_ifdef(&mut b, "A", 1);
    b.tail("\n");
    define(&mut b, "#define CHECK(x,y) ((x)+(y))", 2);
    define(&mut b, "#define PLAIN 1", 3);
    bare_directive(&mut b, "endif", 4);
    let tree = b.finish();

    let result = walker().walk("defs.c", &tree).unwrap();
    assert!(result.registry.function_macros().contains("CHECK"));
    assert!(
        !result.registry.function_macros().contains("PLAIN"),
        "object-like defines are not function macros"
    );
    // the define text is part of the branch's code
    assert!(result.features["A"].codes[0].contains("#define CHECK"));
}
