// src/run_opt.rs
//
// Run options: raw command-line values and the validated RunContext built from them

use clap::Args;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::defaults;
use crate::error::{PipelineError, Result};
use crate::tools::ToolPaths;

#[path = "run_opt_test.rs"]
mod run_opt_test;

/// Block filtering stringency.
///
/// Each mode maps to the single-letter `-b5` code understood by the block
/// filter; `None` skips block filtering altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    High,
    Medium,
    Low,
    None,
}

impl Mode {
    /// Value consumed by the block filter (`-b5=`), or `NO_GBLOCKS` when filtering is skipped.
    pub fn stringency_code(self) -> &'static str {
        match self {
            Mode::High => "n",
            Mode::Medium => "h",
            Mode::Low => "a",
            Mode::None => "NO_GBLOCKS",
        }
    }

    /// Command-line spelling, also used in renamed tree file names.
    pub fn label(self) -> &'static str {
        match self {
            Mode::High => "high",
            Mode::Medium => "med",
            Mode::Low => "low",
            Mode::None => "none",
        }
    }

    pub fn filters_blocks(self) -> bool {
        self != Mode::None
    }
}

impl FromStr for Mode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(Mode::High),
            "med" => Ok(Mode::Medium),
            "low" => Ok(Mode::Low),
            "none" => Ok(Mode::None),
            other => Err(PipelineError::Configuration(format!(
                "--mode must be high, med, low or none (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the substitution model for tree construction comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    /// Run the external model selector and use its best-fit model.
    Select,
    /// Use this model name verbatim, bypassing model selection.
    Fixed(String),
}

/// Parse the aligned-input flag. Accepts `T`/`F` and `true`/`false`.
pub fn parse_aligned_flag(s: &str) -> Result<bool> {
    match s {
        "T" | "true" => Ok(true),
        "F" | "false" => Ok(false),
        other => Err(PipelineError::Configuration(format!(
            "--aligned-file must be T or F (got '{}')",
            other
        ))),
    }
}

fn positive_count(name: &str, value: i64) -> Result<u32> {
    if value <= 0 {
        return Err(PipelineError::Configuration(format!(
            "--{} must be > 0 (got {})",
            name, value
        )));
    }
    u32::try_from(value).map_err(|_| {
        PipelineError::Configuration(format!("--{} is too large (got {})", name, value))
    })
}

#[derive(Debug, Clone, Args)]
pub struct PipelineCliOptions {
    /// Input protein FASTA file (plain or .gz)
    #[arg(short = 'i', long, alias = "input_file", value_name = "FASTA")]
    pub input_file: PathBuf,

    /// Number of threads handed to the model selector and tree builder
    #[arg(short = 't', long, value_name = "INT", allow_negative_numbers = true)]
    pub threads: i64,

    /// Number of RAxML bootstrap replicates
    #[arg(short = 'b', long, value_name = "INT", allow_negative_numbers = true)]
    pub bootstraps: i64,

    /// Block filtering stringency: high (n), med (h), low (a) or none (skip filtering)
    #[arg(short = 'm', long, value_name = "high|med|low|none")]
    pub mode: String,

    /// Is the input already an aligned FASTA file (T or F); T skips the aligner
    #[arg(short = 'a', long, alias = "aligned_file", value_name = "T|F")]
    pub aligned_file: String,

    /// Resolve every external tool inside DIR instead of the default locations
    #[arg(long, value_name = "DIR")]
    pub tools_dir: Option<PathBuf>,

    /// Stop successfully right after model selection, before building trees
    #[arg(long, alias = "stop_after_prottest")]
    pub stop_after_model_selection: bool,

    /// Skip model selection and give RAxML this model (e.g. PROTCATWAG)
    #[arg(long, alias = "skip_prottest", value_name = "MODEL")]
    pub model: Option<String>,

    /// Seed for RAxML parsimony (-p) and rapid bootstrap (-x)
    #[arg(long, value_name = "INT", default_value_t = defaults::RAXML_SEED)]
    pub seed: u64,

    /// Directory that receives all intermediate and output files
    #[arg(short = 'w', long, value_name = "DIR", default_value = ".")]
    pub work_dir: PathBuf,

    /// Remove intermediate files after a successful run
    #[arg(long, default_value_t = defaults::DELETE_INTERMEDIATES)]
    pub delete_intermediates: bool,

    /// Verbose level: 1=error, 2=warning, 3=message, 4=debug, 5+=trace
    #[arg(short = 'v', long, value_name = "INT", default_value_t = defaults::VERBOSITY)]
    pub verbosity: i32,
}

/// Validated, immutable parameters for one pipeline execution.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub input: PathBuf,
    /// File name of the input; every artifact name is derived from it.
    pub basename: String,
    pub work_dir: PathBuf,
    pub threads: u32,
    pub bootstraps: u32,
    pub mode: Mode,
    pub aligned_input: bool,
    pub model: ModelChoice,
    pub stop_after_model_selection: bool,
    pub tools: ToolPaths,
    pub seed: u64,
    pub delete_intermediates: bool,
}

impl RunContext {
    /// Validate raw options. Pure: nothing on disk is inspected or touched.
    pub fn from_options(opts: &PipelineCliOptions) -> Result<Self> {
        let threads = positive_count("threads", opts.threads)?;
        let bootstraps = positive_count("bootstraps", opts.bootstraps)?;
        let mode: Mode = opts.mode.parse()?;
        let aligned_input = parse_aligned_flag(&opts.aligned_file)?;

        let model = match opts.model.as_deref().map(str::trim) {
            None => ModelChoice::Select,
            Some("") => {
                return Err(PipelineError::Configuration(
                    "--model must not be empty".to_string(),
                ));
            }
            Some(name) if name.contains(char::is_whitespace) => {
                return Err(PipelineError::Configuration(format!(
                    "--model must be a single word (got '{}')",
                    name
                )));
            }
            Some(name) => ModelChoice::Fixed(name.to_string()),
        };

        let basename = opts
            .input_file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "input path {} has no usable file name",
                    opts.input_file.display()
                ))
            })?;

        // Tools run with the working directory as their cwd, so a relative
        // tools dir must be resolved against ours. Lexical only, no disk access.
        let tools = match &opts.tools_dir {
            Some(dir) => {
                let dir = std::path::absolute(dir).map_err(|e| {
                    PipelineError::Configuration(format!(
                        "--tools-dir {} cannot be resolved: {}",
                        dir.display(),
                        e
                    ))
                })?;
                ToolPaths::in_dir(&dir)
            }
            None => ToolPaths::standard(),
        };

        Ok(RunContext {
            input: opts.input_file.clone(),
            basename,
            work_dir: opts.work_dir.clone(),
            threads,
            bootstraps,
            mode,
            aligned_input,
            model,
            stop_after_model_selection: opts.stop_after_model_selection,
            tools,
            seed: opts.seed,
            delete_intermediates: opts.delete_intermediates,
        })
    }

    /// `<input><suffix>` relative to the working directory, as handed to tools.
    pub fn artifact_name(&self, suffix: &str) -> String {
        format!("{}{}", self.basename, suffix)
    }

    /// `<input><suffix>` inside the working directory.
    pub fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.work_dir.join(self.artifact_name(suffix))
    }

    /// Any file in the working directory.
    pub fn work_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.work_dir.join(name)
    }
}
