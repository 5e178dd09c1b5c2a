use anyhow::Context;
use clap::Parser;

use ferrous_protpipe::pipeline;
use ferrous_protpipe::rename::TreeArtifact;
use ferrous_protpipe::run_opt::{PipelineCliOptions, RunContext};

#[derive(Parser)]
#[command(name = "ferrous-protpipe")]
#[command(about = "FerrousProtpipe - protein phylogeny pipeline (MSA, Gblocks, ProtTest, RAxML)", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    options: PipelineCliOptions,
}

fn init_logging(verbosity: i32) {
    // Map verbosity (1=error, 2=warning, 3=message, 4=debug, 5+=trace) to log levels
    let log_level = match verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None) // Don't show timestamps
        .format_target(false) // Don't show module names
        .init();
}

fn run(options: &PipelineCliOptions) -> anyhow::Result<()> {
    let ctx = RunContext::from_options(options)?;

    log::info!("Input: {}", ctx.input.display());
    log::info!(
        "Threads: {}, bootstraps: {}, mode: {} ({}), aligned input: {}",
        ctx.threads,
        ctx.bootstraps,
        ctx.mode,
        ctx.mode.stringency_code(),
        ctx.aligned_input
    );

    let report = pipeline::run(&ctx)
        .with_context(|| format!("pipeline failed for {}", ctx.input.display()))?;

    if report.stopped_after_model_selection {
        if let Some(model) = &report.model {
            log::info!("Model for tree construction: {}", model);
        }
        return Ok(());
    }

    if let Some(trees) = &report.trees {
        for path in &trees.written {
            log::info!("Wrote {}", path.display());
        }
        if trees.written.len() < TreeArtifact::ALL.len() {
            log::warn!(
                "{} of {} renamed trees written",
                trees.written.len(),
                TreeArtifact::ALL.len()
            );
        }
    }
    Ok(())
}

fn main() {
    // Every rejected command line exits 1; --help and --version exit 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    init_logging(cli.options.verbosity);

    if let Err(e) = run(&cli.options) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
