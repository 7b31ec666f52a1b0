//! CSV export of analysis reports.
//!
//! Four tables, mirroring the classic variability-analysis outputs: per-file
//! statistics, merged scattering degrees, merged tangling degrees, and the
//! nesting degrees of top-level branches. The full report also serializes
//! to JSON in one piece.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;

use crate::analysis::ProjectReport;
use crate::metrics::BranchNesting;

/// Write the per-file statistics table.
pub fn write_file_stats<W: Write>(writer: W, report: &ProjectReport) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "FILENAME", "LOC", "LOF", "NOFC", "NDMAX", "ANDAVG", "ANDSTDEV", "GRANGL", "GRANFL",
        "GRANBL", "GRANSL", "GRANEL", "GRANML", "GRANERR",
    ])?;
    for file in &report.files {
        csv.write_record([
            file.file.clone(),
            file.loc.to_string(),
            file.feature_lines.to_string(),
            file.feature_constants.to_string(),
            file.nesting.max.to_string(),
            format!("{:.4}", file.nesting.mean),
            format!("{:.4}", file.nesting.std_dev),
            file.granularity.compilation_unit.to_string(),
            (file.granularity.function + file.granularity.type_declaration).to_string(),
            file.granularity.statement_block.to_string(),
            file.granularity.statement.to_string(),
            file.granularity.expression.to_string(),
            file.granularity.parameter.to_string(),
            file.granularity.errors.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the whole project report as pretty-printed JSON.
pub fn write_json_report<W: Write>(writer: W, report: &ProjectReport) -> Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Write the merged scattering-degree table, one row per feature constant.
pub fn write_scattering_degrees<W: Write>(
    writer: W,
    scattering: &BTreeMap<String, usize>,
) -> Result<()> {
    write_degree_table(writer, ["define", "SD"], scattering)
}

/// Write the merged tangling-degree table, one row per signature.
pub fn write_tangling_degrees<W: Write>(
    writer: W,
    tangling: &BTreeMap<String, usize>,
) -> Result<()> {
    write_degree_table(writer, ["signature", "TD"], tangling)
}

fn write_degree_table<W: Write>(
    writer: W,
    header: [&str; 2],
    degrees: &BTreeMap<String, usize>,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header)?;
    for (key, degree) in degrees {
        csv.write_record([key.clone(), degree.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the nesting degrees of top-level branches.
pub fn write_branch_nesting<W: Write>(writer: W, branches: &[BranchNesting]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["file", "signature", "ND"])?;
    for branch in branches {
        csv.write_record([
            branch.file.clone(),
            branch.signature.clone(),
            branch.max_depth.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}
