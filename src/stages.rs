//! Pipeline stages
//!
//! The stage list is fixed:
//!
//! ```text
//! Rename → Align → Intermediate → BlockFilter → Phylip → ModelSelection → TreeBuild
//! ```
//!
//! This module holds the stage vocabulary (kinds, fatality, recorded
//! results) and builds the command descriptor for each external stage from
//! the [`RunContext`]. Sequencing lives in `pipeline`.

use std::fmt;

use crate::defaults::{
    ALIGNED_SUFFIX, FILTERED_SUFFIX, INTERMEDIATE_SUFFIX, MODEL_SUFFIX, PHYLIP_SUFFIX,
    RENAME_SUFFIX,
};
use crate::run_opt::{Mode, RunContext};
use crate::tools::{Tool, ToolCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Rename,
    Align,
    Intermediate,
    BlockFilter,
    Phylip,
    ModelSelection,
    TreeBuild,
}

impl StageKind {
    pub const ORDER: [StageKind; 7] = [
        StageKind::Rename,
        StageKind::Align,
        StageKind::Intermediate,
        StageKind::BlockFilter,
        StageKind::Phylip,
        StageKind::ModelSelection,
        StageKind::TreeBuild,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StageKind::Rename => "rename",
            StageKind::Align => "align",
            StageKind::Intermediate => "convert-to-intermediate",
            StageKind::BlockFilter => "block-filter",
            StageKind::Phylip => "convert-to-phylip",
            StageKind::ModelSelection => "model-selection",
            StageKind::TreeBuild => "tree-construction",
        }
    }

    /// How a non-zero result code from this stage is treated.
    ///
    /// The block filter exits non-zero on benign conditions, so only its
    /// result code is advisory.
    pub fn fatality(self) -> Fatality {
        match self {
            StageKind::BlockFilter => Fatality::Advisory,
            _ => Fatality::Fatal,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fatality {
    /// Abort the run.
    Fatal,
    /// Log and continue.
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    /// The stage's command ran and returned 0.
    Succeeded,
    /// A local file operation stood in for the external tool.
    Substituted(&'static str),
    /// Not run for this configuration.
    Skipped(&'static str),
    /// Advisory stage returned non-zero; the run continued.
    Advisory { code: Option<i32> },
}

/// Result of one stage, appended in execution order and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub kind: StageKind,
    pub status: StageStatus,
}

/// Block-size parameters for the block filter, derived from the sequence count.
///
/// With `n` aligned sequences: minimum sequences for a conserved position
/// (`b1`) and for a flank position (`b2`) are `n/2 + 1`, the maximum run of
/// contiguous non-conserved positions (`b3`) is `n/2`, the minimum block
/// length (`b4`) is 2, and `b5` is the gap stringency code of the mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFilterParams {
    pub b1: usize,
    pub b2: usize,
    pub b3: usize,
    pub b4: usize,
    pub b5: &'static str,
}

impl BlockFilterParams {
    /// `None` for [`Mode::None`], which skips block filtering.
    pub fn derive(sequence_count: usize, mode: Mode) -> Option<Self> {
        if !mode.filters_blocks() {
            return None;
        }
        let half = sequence_count / 2;
        Some(BlockFilterParams {
            b1: half + 1,
            b2: half + 1,
            b3: half,
            b4: 2,
            b5: mode.stringency_code(),
        })
    }

    pub fn to_args(&self) -> Vec<String> {
        vec![
            format!("-b1={}", self.b1),
            format!("-b2={}", self.b2),
            format!("-b3={}", self.b3),
            format!("-b4={}", self.b4),
            format!("-b5={}", self.b5),
        ]
    }
}

/// `muscle -in <input>.rename -out <input>.al`
pub fn align_command(ctx: &RunContext) -> ToolCommand {
    ToolCommand::new(Tool::Aligner, &ctx.tools.aligner, &ctx.work_dir)
        .arg("-in")
        .arg(ctx.artifact_name(RENAME_SUFFIX))
        .arg("-out")
        .arg(ctx.artifact_name(ALIGNED_SUFFIX))
}

/// `Gblocks <input>.tmp -t=p -p=n -e=.fst -b1=.. -b5=..`; writes `<input>.tmp.fst`.
pub fn block_filter_command(ctx: &RunContext, params: &BlockFilterParams) -> ToolCommand {
    ToolCommand::new(Tool::BlockFilter, &ctx.tools.block_filter, &ctx.work_dir)
        .arg(ctx.artifact_name(INTERMEDIATE_SUFFIX))
        .args(["-t=p", "-p=n", "-e=.fst"])
        .args(params.to_args())
}

/// `fasta2phy < <input>.tmp.fst > <input>.phy`
pub fn phylip_command(ctx: &RunContext) -> ToolCommand {
    ToolCommand::new(Tool::FastaToPhylip, &ctx.tools.fasta_to_phylip, &ctx.work_dir)
        .stdin_from(ctx.artifact_path(FILTERED_SUFFIX))
        .stdout_to(ctx.artifact_path(PHYLIP_SUFFIX))
}

/// ProtTest over every matrix and rate distribution; report goes to `<input>.model`.
pub fn model_selection_command(ctx: &RunContext) -> ToolCommand {
    ToolCommand::new(Tool::ModelSelector, &ctx.tools.java, &ctx.work_dir)
        .arg("-jar")
        .arg(ctx.tools.model_selector_jar.display().to_string())
        .arg("-i")
        .arg(ctx.artifact_name(PHYLIP_SUFFIX))
        .arg("-o")
        .arg(ctx.artifact_name(MODEL_SUFFIX))
        .args(["-all-matrices", "-all-distributions", "-log", "disabled"])
        .arg("-threads")
        .arg(ctx.threads.to_string())
}

/// RAxML rapid bootstrap plus best-tree search (`-f a`) under `model`.
pub fn tree_command(ctx: &RunContext, model: &str) -> ToolCommand {
    let seed = ctx.seed.to_string();
    ToolCommand::new(Tool::TreeBuilder, &ctx.tools.tree_builder, &ctx.work_dir)
        .args(["-f", "a", "-m", model, "-n", ctx.basename.as_str()])
        .arg("-N")
        .arg(ctx.bootstraps.to_string())
        .args(["-p", seed.as_str(), "-s"])
        .arg(ctx.artifact_name(PHYLIP_SUFFIX))
        .args(["-x", seed.as_str(), "-T"])
        .arg(ctx.threads.to_string())
}
