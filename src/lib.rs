pub mod cleanup; // Intermediate artifact removal
pub mod defaults;
pub mod error;
pub mod identifier; // Synthetic g_<i> identifiers: encode, decode, sanitize
pub mod model_report; // Best-fit model parsing from the model selector report
pub mod pipeline; // Stage sequencing and pre-flight checks
pub mod rename; // Restores original names in output trees
pub mod run_opt; // CLI options and validated RunContext
pub mod stages; // Stage vocabulary and command descriptors
pub mod tools; // External tool paths and command execution
pub mod utils;

pub use error::{PipelineError, Result};
pub use pipeline::{run, run_with, RunReport};
pub use run_opt::{Mode, ModelChoice, PipelineCliOptions, RunContext};
