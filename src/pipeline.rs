//! Pipeline orchestration
//!
//! Drives one run from a validated [`RunContext`]:
//!
//! ```text
//! pre-flight → rename (encode) → align | copy → intermediate copy
//!   → block filter | direct rename → FASTA→PHYLIP → model selection | fixed model
//!   → [early exit] → tree construction → rename output trees → [cleanup]
//! ```
//!
//! Strictly sequential: every external command is awaited before the next
//! one starts. Fatal conditions return a [`PipelineError`] immediately and
//! nothing is cleaned up. Advisory conditions are logged and recorded in the
//! [`RunReport`].

use std::fs;
use std::io;
use std::path::Path;

use crate::cleanup::remove_intermediates;
use crate::defaults::{
    ALIGNED_SUFFIX, FILTERED_SUFFIX, INTERMEDIATE_SUFFIX, MODEL_SUFFIX, PHYLIP_SUFFIX,
    RENAME_SUFFIX, TREE_BUILDER_OUTPUT_PREFIXES,
};
use crate::error::{PipelineError, Result};
use crate::identifier::{encode_file, IdentifierMap};
use crate::model_report::{raxml_protein_model, read_best_model};
use crate::rename::{rename_trees, RenameReport};
use crate::run_opt::{ModelChoice, RunContext};
use crate::stages::{
    align_command, block_filter_command, model_selection_command, phylip_command, tree_command,
    BlockFilterParams, Fatality, StageKind, StageRecord, StageStatus,
};
use crate::tools::{CommandExecutor, ProcessExecutor, ToolCommand};
use crate::utils::{count_fasta_records, exists};

/// What a completed run did.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Stage results in execution order.
    pub stages: Vec<StageRecord>,
    pub identifiers: IdentifierMap,
    /// Sequences counted in the aligned artifact.
    pub aligned_sequences: usize,
    pub block_filter: Option<BlockFilterParams>,
    /// Model argument handed (or to be handed) to the tree builder.
    pub model: Option<String>,
    pub stopped_after_model_selection: bool,
    /// `None` when the run stopped before tree construction.
    pub trees: Option<RenameReport>,
}

impl RunReport {
    pub fn status_of(&self, kind: StageKind) -> Option<&StageStatus> {
        self.stages.iter().find(|r| r.kind == kind).map(|r| &r.status)
    }
}

/// Refuse to start when tree builder outputs for this input already exist.
///
/// Advisory guard only: another run may still create them between this
/// check and the first write.
pub fn preflight(ctx: &RunContext) -> Result<()> {
    for prefix in TREE_BUILDER_OUTPUT_PREFIXES {
        let path = ctx.work_path(format!("{}{}", prefix, ctx.basename));
        if exists(&path) {
            return Err(PipelineError::PreflightConflict { path });
        }
    }
    if !ctx.input.is_file() {
        return Err(PipelineError::io(
            &ctx.input,
            io::Error::new(io::ErrorKind::NotFound, "input file not found"),
        ));
    }
    Ok(())
}

/// Run the pipeline with real external processes.
pub fn run(ctx: &RunContext) -> Result<RunReport> {
    run_with(ctx, &mut ProcessExecutor)
}

/// Run the pipeline, launching external commands through `executor`.
pub fn run_with<E: CommandExecutor + ?Sized>(ctx: &RunContext, executor: &mut E) -> Result<RunReport> {
    Pipeline {
        ctx,
        executor,
        report: RunReport::default(),
    }
    .execute()
}

struct Pipeline<'a, E: CommandExecutor + ?Sized> {
    ctx: &'a RunContext,
    executor: &'a mut E,
    report: RunReport,
}

impl<'a, E: CommandExecutor + ?Sized> Pipeline<'a, E> {
    fn execute(mut self) -> Result<RunReport> {
        let ctx = self.ctx;
        log::info!("Pipeline started for {}", ctx.input.display());
        preflight(ctx)?;

        log::info!("-- Renaming input fasta sequences");
        self.report.identifiers = encode_file(&ctx.input, &ctx.artifact_path(RENAME_SUFFIX))?;
        log::info!("Renamed {} sequences", self.report.identifiers.len());
        self.record(StageKind::Rename, StageStatus::Succeeded);

        self.align()?;

        log::info!("-- Copying alignment to intermediate file");
        copy_artifact(
            &ctx.artifact_path(ALIGNED_SUFFIX),
            &ctx.artifact_path(INTERMEDIATE_SUFFIX),
        )?;
        self.record(StageKind::Intermediate, StageStatus::Substituted("copied alignment"));

        self.block_filter()?;

        log::info!("-- Converting to phylip format");
        let status = self.run_tool(StageKind::Phylip, phylip_command(ctx))?;
        self.record(StageKind::Phylip, status);

        let model = self.select_model()?;
        self.report.model = Some(model.clone());

        if ctx.stop_after_model_selection {
            log::info!("Stopping after model selection as requested");
            self.report.stopped_after_model_selection = true;
            return Ok(self.report);
        }

        log::info!("-- Starting tree construction with model {}", model);
        let status = self.run_tool(StageKind::TreeBuild, tree_command(ctx, &model))?;
        self.record(StageKind::TreeBuild, status);

        self.report.trees = Some(rename_trees(ctx, &self.report.identifiers)?);

        if ctx.delete_intermediates {
            remove_intermediates(ctx);
        }

        log::info!("Pipeline finished");
        Ok(self.report)
    }

    fn align(&mut self) -> Result<()> {
        let ctx = self.ctx;
        let aligned = ctx.artifact_path(ALIGNED_SUFFIX);

        if ctx.aligned_input {
            log::info!("Input file is aligned fasta, copying it to {}", aligned.display());
            copy_artifact(&ctx.artifact_path(RENAME_SUFFIX), &aligned)?;
            self.record(StageKind::Align, StageStatus::Substituted("input already aligned"));
            return Ok(());
        }

        log::info!("-- Starting MSA on {}", ctx.artifact_name(RENAME_SUFFIX));
        let status = self.run_tool(StageKind::Align, align_command(ctx))?;
        require_artifact(StageKind::Align, &aligned)?;
        self.record(StageKind::Align, status);
        Ok(())
    }

    fn block_filter(&mut self) -> Result<()> {
        let ctx = self.ctx;
        let aligned = ctx.artifact_path(ALIGNED_SUFFIX);
        let filtered = ctx.artifact_path(FILTERED_SUFFIX);

        // Recounted from the alignment itself, not taken from the input
        let count = count_fasta_records(&aligned).map_err(|e| PipelineError::io(&aligned, e))?;
        log::info!("The number of sequences in alignment file = {}", count);
        self.report.aligned_sequences = count;

        match BlockFilterParams::derive(count, ctx.mode) {
            Some(params) => {
                log::info!("-- Running block filter to detect conserved regions in the MSA");
                let status = self.run_tool(StageKind::BlockFilter, block_filter_command(ctx, &params))?;
                require_artifact(StageKind::BlockFilter, &filtered)?;
                self.report.block_filter = Some(params);
                self.record(StageKind::BlockFilter, status);
            }
            None => {
                log::info!("Mode none: skipping block filter");
                let intermediate = ctx.artifact_path(INTERMEDIATE_SUFFIX);
                fs::rename(&intermediate, &filtered)
                    .map_err(|e| PipelineError::io(&intermediate, e))?;
                self.record(StageKind::BlockFilter, StageStatus::Substituted("mode none"));
            }
        }
        Ok(())
    }

    fn select_model(&mut self) -> Result<String> {
        let ctx = self.ctx;
        match &ctx.model {
            ModelChoice::Select => {
                log::info!("-- Starting model selection");
                let status = self.run_tool(StageKind::ModelSelection, model_selection_command(ctx))?;
                let report = ctx.artifact_path(MODEL_SUFFIX);
                require_artifact(StageKind::ModelSelection, &report)?;
                let best = read_best_model(&report)?;
                log::info!("Best model from model selection was: {}", best);
                self.record(StageKind::ModelSelection, status);
                Ok(raxml_protein_model(&best))
            }
            ModelChoice::Fixed(name) => {
                log::info!("Skipping model selection, using model {}", name);
                self.record(StageKind::ModelSelection, StageStatus::Skipped("model supplied"));
                Ok(name.clone())
            }
        }
    }

    /// Launch one external command and classify its result code.
    fn run_tool(&mut self, kind: StageKind, command: ToolCommand) -> Result<StageStatus> {
        log::debug!("[{}] {}", kind, command);

        if let Some(stdin) = &command.stdin {
            require_artifact(kind, stdin)?;
        }

        let outcome = self
            .executor
            .execute(&command)
            .map_err(|source| PipelineError::ToolLaunch {
                stage: kind,
                program: command.program_name(),
                source,
            })?;

        if outcome.is_success() {
            log::info!("-- done with {}", kind);
            return Ok(StageStatus::Succeeded);
        }

        match kind.fatality() {
            Fatality::Fatal => Err(PipelineError::ExternalToolFailure {
                stage: kind,
                program: command.program_name(),
                code: outcome.code,
            }),
            Fatality::Advisory => {
                log::warn!(
                    "{} returned {:?}; continuing ({} exit codes are advisory)",
                    command.program_name(),
                    outcome.code,
                    kind
                );
                Ok(StageStatus::Advisory { code: outcome.code })
            }
        }
    }

    fn record(&mut self, kind: StageKind, status: StageStatus) {
        self.report.stages.push(StageRecord { kind, status });
    }
}

fn copy_artifact(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(|e| PipelineError::io(from, e))?;
    Ok(())
}

fn require_artifact(stage: StageKind, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingArtifact {
            stage,
            path: path.to_path_buf(),
        })
    }
}
