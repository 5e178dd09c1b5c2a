// Best-fit model extraction from the model selector's report
//
// ProtTest ends its report with one line per information criterion, e.g.
//
//   Best model according to AIC: LG+I+G
//   Best model according to BIC: WAG+G
//
// Only the first such line is used; later criteria are ignored.

use std::fs;
use std::path::Path;

use crate::error::{PipelineError, Result};

const BEST_MODEL_MARKER: &str = "Best model according to";

// Whitespace field holding the model name ("Best model according to AIC: <model>")
const MODEL_FIELD: usize = 5;

/// Best-fit model name from report text: the sixth whitespace-delimited field
/// of the first matching line, with any `+suffix` removed, upper-cased.
pub fn parse_best_model(report: &str) -> Option<String> {
    let line = report.lines().find(|l| l.contains(BEST_MODEL_MARKER))?;
    let field = line.split_whitespace().nth(MODEL_FIELD)?;
    let base = field.split('+').next().unwrap_or(field);
    if base.is_empty() {
        return None;
    }
    Some(base.to_uppercase())
}

/// [`parse_best_model`] over the report file written by the model selector.
pub fn read_best_model(path: &Path) -> Result<String> {
    let report = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    parse_best_model(&report).ok_or_else(|| PipelineError::NoBestModel {
        report: path.to_path_buf(),
    })
}

/// Model argument for the tree builder when the model came from the selector.
pub fn raxml_protein_model(best: &str) -> String {
    format!("PROTCAT{}", best)
}
