//! Pipeline error types.
//!
//! Every fatal condition of a run surfaces as a [`PipelineError`] returned up
//! the call chain to `main`, which logs it and exits with status 1. Advisory
//! conditions (block filter exit codes, absent bipartition trees) are not
//! errors; they are recorded in the run report instead.

use std::io;
use std::path::PathBuf;

use crate::stages::StageKind;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Bad run parameters, detected before any file is touched.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Tree builder outputs for this input already exist in the working directory.
    #[error("{} already exists; remove it or run from another directory", .path.display())]
    PreflightConflict { path: PathBuf },

    /// A fatal-classified stage returned a non-zero result code.
    #[error("{stage} failed: {program} exited with {}", describe_code(.code))]
    ExternalToolFailure {
        stage: StageKind,
        program: String,
        code: Option<i32>,
    },

    /// The external program could not be started at all.
    #[error("{stage}: could not launch {program}")]
    ToolLaunch {
        stage: StageKind,
        program: String,
        #[source]
        source: io::Error,
    },

    /// A stage reported success but did not leave its expected output behind.
    #[error("{stage} did not produce {}", .path.display())]
    MissingArtifact { stage: StageKind, path: PathBuf },

    #[error("no FASTA records found in {}", .path.display())]
    NoSequences { path: PathBuf },

    #[error("no 'Best model according to' line in {}", .report.display())]
    NoBestModel { report: PathBuf },

    #[error("i/o error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "no status (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
