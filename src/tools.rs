//! External tool invocation
//!
//! Every external program is described by a [`ToolCommand`]: a program path
//! plus an ordered argument vector, with optional stdin/stdout redirection to
//! files. Nothing is ever passed through a shell, so header text can never be
//! interpreted as shell syntax.
//!
//! Commands run through a [`CommandExecutor`]. [`ProcessExecutor`] spawns real
//! processes; tests substitute an executor that fakes the tools.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::defaults;

/// The external collaborators of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Aligner,
    FastaToPhylip,
    BlockFilter,
    ModelSelector,
    TreeBuilder,
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::Aligner => "aligner",
            Tool::FastaToPhylip => "fasta-to-phylip converter",
            Tool::BlockFilter => "block filter",
            Tool::ModelSelector => "model selector",
            Tool::TreeBuilder => "tree builder",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Locations of the external programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub aligner: PathBuf,
    pub fasta_to_phylip: PathBuf,
    pub block_filter: PathBuf,
    pub java: PathBuf,
    pub model_selector_jar: PathBuf,
    pub tree_builder: PathBuf,
}

impl ToolPaths {
    /// Default installation: tools on `PATH`, converter and jar at fixed locations.
    pub fn standard() -> Self {
        ToolPaths {
            aligner: PathBuf::from(defaults::ALIGNER),
            fasta_to_phylip: PathBuf::from(defaults::FASTA_TO_PHYLIP),
            block_filter: PathBuf::from(defaults::BLOCK_FILTER),
            java: PathBuf::from(defaults::JAVA),
            model_selector_jar: PathBuf::from(defaults::MODEL_SELECTOR_JAR),
            tree_builder: PathBuf::from(defaults::TREE_BUILDER),
        }
    }

    /// Alternate path set: every tool (except `java`) lives inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        ToolPaths {
            aligner: dir.join(defaults::ALIGNER_FILE),
            fasta_to_phylip: dir.join(defaults::FASTA_TO_PHYLIP_FILE),
            block_filter: dir.join(defaults::BLOCK_FILTER_FILE),
            java: PathBuf::from(defaults::JAVA),
            model_selector_jar: dir.join(defaults::MODEL_SELECTOR_JAR_FILE),
            tree_builder: dir.join(defaults::TREE_BUILDER_FILE),
        }
    }
}

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub tool: Tool,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Working directory of the child; relative arguments resolve against it.
    pub current_dir: PathBuf,
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(tool: Tool, program: impl Into<PathBuf>, current_dir: impl Into<PathBuf>) -> Self {
        ToolCommand {
            tool,
            program: program.into(),
            args: Vec::new(),
            current_dir: current_dir.into(),
            stdin: None,
            stdout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl fmt::Display for ToolCommand {
    /// Shell-like rendering for logs only; never executed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(stdin) = &self.stdin {
            write!(f, " < {}", stdin.display())?;
        }
        if let Some(stdout) = &self.stdout {
            write!(f, " > {}", stdout.display())?;
        }
        Ok(())
    }
}

/// Completion status of an external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ToolOutcome {
    pub fn success() -> Self {
        ToolOutcome { code: Some(0) }
    }

    pub fn exited(code: i32) -> Self {
        ToolOutcome { code: Some(code) }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a command synchronously and reports how it completed.
///
/// An `Err` means the command could not be started (or its redirections
/// could not be opened); a started command that fails is an `Ok` with a
/// non-zero [`ToolOutcome`].
pub trait CommandExecutor {
    fn execute(&mut self, command: &ToolCommand) -> io::Result<ToolOutcome>;
}

/// Spawns real child processes and waits for them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl CommandExecutor for ProcessExecutor {
    fn execute(&mut self, command: &ToolCommand) -> io::Result<ToolOutcome> {
        let mut process = Command::new(&command.program);
        process.args(&command.args).current_dir(&command.current_dir);

        if let Some(path) = &command.stdin {
            process.stdin(Stdio::from(File::open(path)?));
        }
        if let Some(path) = &command.stdout {
            process.stdout(Stdio::from(File::create(path)?));
        }

        let status = process.status()?;
        Ok(ToolOutcome {
            code: status.code(),
        })
    }
}
