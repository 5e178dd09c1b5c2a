//! End-to-end pipeline scenarios with faked external tools
//!
//! `FakeTools` stands in for muscle, Gblocks, fasta2phy, ProtTest and RAxML:
//! it records every command and writes the files the real tool would write,
//! so the stage machine, pre-flight and renaming logic can be exercised
//! without any of the binaries installed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ferrous_protpipe::error::PipelineError;
use ferrous_protpipe::rename::TreeArtifact;
use ferrous_protpipe::run_opt::{PipelineCliOptions, RunContext};
use ferrous_protpipe::stages::{StageKind, StageStatus};
use ferrous_protpipe::tools::{CommandExecutor, Tool, ToolCommand, ToolOutcome};
use ferrous_protpipe::run_with;
use tempfile::TempDir;

const FOUR_SEQS: &str = ">sp|P1|ALPHA first protein\nMKVLA\nAGG\n>beta:2\nMKVLS\nAGG\n>gamma(3)\nMRVLA\nAGG\n>delta\nMKILA\nAGC\n";

const PROTTEST_REPORT: &str = "\
ProtTest 3.4
Best model according to AIC: LG+I+G
Best model according to BIC: JTT+G
";

struct FakeTools {
    calls: Vec<ToolCommand>,
    aligner_code: i32,
    /// Keep only this many records when "aligning"
    aligner_keeps: Option<usize>,
    block_filter_code: i32,
    block_filter_writes_output: bool,
    model_report: String,
    write_best_tree: bool,
    write_bipartitions: bool,
}

impl Default for FakeTools {
    fn default() -> Self {
        FakeTools {
            calls: Vec::new(),
            aligner_code: 0,
            aligner_keeps: None,
            block_filter_code: 0,
            block_filter_writes_output: true,
            model_report: PROTTEST_REPORT.to_string(),
            write_best_tree: true,
            write_bipartitions: true,
        }
    }
}

impl FakeTools {
    fn tools_called(&self) -> Vec<Tool> {
        self.calls.iter().map(|c| c.tool).collect()
    }

    fn value_after<'a>(cmd: &'a ToolCommand, flag: &str) -> &'a str {
        let pos = cmd.args.iter().position(|a| a == flag).expect("flag present");
        &cmd.args[pos + 1]
    }

    fn keep_records(fasta: &str, keep: usize) -> String {
        let mut out = String::new();
        let mut seen = 0;
        for line in fasta.lines() {
            if line.starts_with('>') {
                seen += 1;
            }
            if seen <= keep {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    fn tree_for(phylip: &str) -> String {
        let n = phylip.lines().filter(|l| l.starts_with('>')).count();
        let leaves: Vec<String> = (0..n).map(|i| format!("g_{}:0.{}", i, i + 1)).collect();
        format!("({});\n", leaves.join(","))
    }
}

impl CommandExecutor for FakeTools {
    fn execute(&mut self, cmd: &ToolCommand) -> io::Result<ToolOutcome> {
        self.calls.push(cmd.clone());
        let dir = cmd.current_dir.clone();

        match cmd.tool {
            Tool::Aligner => {
                if self.aligner_code != 0 {
                    return Ok(ToolOutcome::exited(self.aligner_code));
                }
                let input = fs::read_to_string(dir.join(Self::value_after(cmd, "-in")))?;
                let aligned = match self.aligner_keeps {
                    Some(keep) => Self::keep_records(&input, keep),
                    None => input,
                };
                fs::write(dir.join(Self::value_after(cmd, "-out")), aligned)?;
                Ok(ToolOutcome::success())
            }
            Tool::BlockFilter => {
                if self.block_filter_writes_output {
                    let input = dir.join(&cmd.args[0]);
                    fs::copy(&input, dir.join(format!("{}.fst", cmd.args[0])))?;
                }
                Ok(ToolOutcome::exited(self.block_filter_code))
            }
            Tool::FastaToPhylip => {
                let input = fs::read_to_string(cmd.stdin.as_ref().expect("stdin"))?;
                fs::write(cmd.stdout.as_ref().expect("stdout"), input)?;
                Ok(ToolOutcome::success())
            }
            Tool::ModelSelector => {
                fs::write(dir.join(Self::value_after(cmd, "-o")), &self.model_report)?;
                fs::create_dir_all(dir.join("snapshot"))?;
                Ok(ToolOutcome::success())
            }
            Tool::TreeBuilder => {
                let name = Self::value_after(cmd, "-n");
                let phylip = fs::read_to_string(dir.join(Self::value_after(cmd, "-s")))?;
                let tree = Self::tree_for(&phylip);
                if self.write_best_tree {
                    fs::write(dir.join(format!("RAxML_bestTree.{}", name)), &tree)?;
                }
                if self.write_bipartitions {
                    fs::write(dir.join(format!("RAxML_bipartitions.{}", name)), &tree)?;
                    fs::write(
                        dir.join(format!("RAxML_bipartitionsBranchLabels.{}", name)),
                        &tree,
                    )?;
                }
                fs::write(dir.join(format!("RAxML_info.{}", name)), "info\n")?;
                fs::write(dir.join(format!("RAxML_bootstrap.{}", name)), &tree)?;
                Ok(ToolOutcome::success())
            }
        }
    }
}

fn options(work_dir: &Path, input: &Path) -> PipelineCliOptions {
    PipelineCliOptions {
        input_file: input.to_path_buf(),
        threads: 2,
        bootstraps: 10,
        mode: "med".to_string(),
        aligned_file: "F".to_string(),
        tools_dir: None,
        stop_after_model_selection: false,
        model: None,
        seed: 1234,
        work_dir: work_dir.to_path_buf(),
        delete_intermediates: false,
        verbosity: 3,
    }
}

fn setup(content: &str) -> io::Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let input = dir.path().join("seqs.faa");
    fs::write(&input, content)?;
    Ok((dir, input))
}

fn renamed_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".renamed"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_full_run_restores_original_names() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools::default();

    let report = run_with(&ctx, &mut tools).expect("run should succeed");

    assert_eq!(
        tools.tools_called(),
        vec![
            Tool::Aligner,
            Tool::BlockFilter,
            Tool::FastaToPhylip,
            Tool::ModelSelector,
            Tool::TreeBuilder
        ]
    );
    let kinds: Vec<StageKind> = report.stages.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, StageKind::ORDER.to_vec());

    assert_eq!(report.identifiers.len(), 4);
    assert_eq!(report.aligned_sequences, 4);
    assert_eq!(report.model.as_deref(), Some("PROTCATLG"));

    let tree_cmd = tools.calls.last().unwrap();
    assert!(tree_cmd.args.join(" ").contains("-m PROTCATLG -n seqs.faa -N 10"));

    let best = fs::read_to_string(dir.path().join("bestTree.seqs.faa_mode_med.renamed"))?;
    assert_eq!(
        best,
        "(sp|P1|ALPHA:0.1,beta_2:0.2,gamma_3_:0.3,delta:0.4);\n"
    );
    assert_eq!(renamed_files(dir.path()).len(), 3);

    let trees = report.trees.expect("trees renamed");
    assert!(trees.issues.is_empty());
    assert!(trees.unmapped.is_empty());
    Ok(())
}

#[test]
fn test_two_record_scenario() -> io::Result<()> {
    let (dir, input) = setup(">seqA\nMKV\n>seqB:test\nMKL\n")?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools::default();

    run_with(&ctx, &mut tools).expect("run should succeed");

    assert_eq!(
        fs::read_to_string(dir.path().join("seqs.faa.rename"))?,
        ">g_0\nMKV\n>g_1\nMKL\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("bestTree.seqs.faa_mode_med.renamed"))?,
        "(seqA:0.1,seqB_test:0.2);\n"
    );
    Ok(())
}

#[test]
fn test_block_count_recomputed_from_alignment() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools {
        aligner_keeps: Some(2),
        ..FakeTools::default()
    };

    let report = run_with(&ctx, &mut tools).expect("run should succeed");

    assert_eq!(report.aligned_sequences, 2);
    let gblocks = &tools.calls[1];
    assert_eq!(gblocks.tool, Tool::BlockFilter);
    assert!(gblocks.args.contains(&"-b1=2".to_string()));
    assert!(gblocks.args.contains(&"-b3=1".to_string()));
    assert!(gblocks.args.contains(&"-b5=h".to_string()));
    Ok(())
}

#[test]
fn test_block_filter_nonzero_is_advisory() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools {
        block_filter_code: 1,
        ..FakeTools::default()
    };

    let report = run_with(&ctx, &mut tools).expect("advisory failure must not abort");

    assert_eq!(
        report.status_of(StageKind::BlockFilter),
        Some(&StageStatus::Advisory { code: Some(1) })
    );
    assert_eq!(tools.calls.last().unwrap().tool, Tool::TreeBuilder);
    Ok(())
}

#[test]
fn test_block_filter_without_output_is_fatal() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools {
        block_filter_code: 1,
        block_filter_writes_output: false,
        ..FakeTools::default()
    };

    match run_with(&ctx, &mut tools) {
        Err(PipelineError::MissingArtifact { stage, .. }) => {
            assert_eq!(stage, StageKind::BlockFilter)
        }
        other => panic!("expected MissingArtifact, got {:?}", other),
    }
    assert_eq!(tools.tools_called(), vec![Tool::Aligner, Tool::BlockFilter]);
    Ok(())
}

#[test]
fn test_aligner_failure_aborts_immediately() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools {
        aligner_code: 2,
        ..FakeTools::default()
    };

    match run_with(&ctx, &mut tools) {
        Err(PipelineError::ExternalToolFailure { stage, code, .. }) => {
            assert_eq!(stage, StageKind::Align);
            assert_eq!(code, Some(2));
        }
        other => panic!("expected ExternalToolFailure, got {:?}", other),
    }
    assert_eq!(tools.tools_called(), vec![Tool::Aligner]);
    assert!(!dir.path().join("seqs.faa.tmp").exists());
    assert!(!dir.path().join("seqs.faa.phy").exists());
    Ok(())
}

#[test]
fn test_preflight_conflict_touches_nothing() -> io::Result<()> {
    for prefix in [
        "RAxML_bestTree.",
        "RAxML_bipartitionsBranchLabels.",
        "RAxML_bipartitions.",
        "RAxML_bootstrap.",
        "RAxML_info.",
    ] {
        let (dir, input) = setup(FOUR_SEQS)?;
        fs::write(dir.path().join(format!("{}seqs.faa", prefix)), "old run\n")?;
        let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
        let mut tools = FakeTools::default();

        match run_with(&ctx, &mut tools) {
            Err(PipelineError::PreflightConflict { path }) => {
                assert!(path.ends_with(format!("{}seqs.faa", prefix)))
            }
            other => panic!("expected PreflightConflict for {}, got {:?}", prefix, other),
        }
        assert!(tools.calls.is_empty());
        assert!(!dir.path().join("seqs.faa.rename").exists());
    }
    Ok(())
}

#[test]
fn test_missing_input_fails_before_writing() -> io::Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("absent.faa");
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools::default();

    assert!(matches!(
        run_with(&ctx, &mut tools),
        Err(PipelineError::Io { .. })
    ));
    assert!(!dir.path().join("absent.faa.rename").exists());
    Ok(())
}

#[test]
fn test_missing_best_tree_aborts_without_renamed_files() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools {
        write_best_tree: false,
        ..FakeTools::default()
    };

    match run_with(&ctx, &mut tools) {
        Err(PipelineError::MissingArtifact { stage, path }) => {
            assert_eq!(stage, StageKind::TreeBuild);
            assert!(path.ends_with("RAxML_bestTree.seqs.faa"));
        }
        other => panic!("expected MissingArtifact, got {:?}", other),
    }
    assert!(renamed_files(dir.path()).is_empty());
    Ok(())
}

#[test]
fn test_missing_bipartitions_are_reported_not_fatal() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools {
        write_bipartitions: false,
        ..FakeTools::default()
    };

    let report = run_with(&ctx, &mut tools).expect("run should succeed");
    let trees = report.trees.expect("trees renamed");
    assert_eq!(trees.written.len(), 1);
    let skipped: Vec<TreeArtifact> = trees.issues.iter().map(|i| i.artifact).collect();
    assert_eq!(
        skipped,
        vec![TreeArtifact::BipartitionsBranchLabels, TreeArtifact::Bipartitions]
    );
    assert_eq!(
        renamed_files(dir.path()),
        vec!["bestTree.seqs.faa_mode_med.renamed".to_string()]
    );
    Ok(())
}

#[test]
fn test_stop_after_model_selection() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let mut opts = options(dir.path(), &input);
    opts.stop_after_model_selection = true;
    let ctx = RunContext::from_options(&opts).unwrap();
    let mut tools = FakeTools::default();

    let report = run_with(&ctx, &mut tools).expect("early exit is a success");

    assert!(report.stopped_after_model_selection);
    assert_eq!(report.model.as_deref(), Some("PROTCATLG"));
    assert!(!tools.tools_called().contains(&Tool::TreeBuilder));
    assert_eq!(report.status_of(StageKind::TreeBuild), None);
    assert!(report.trees.is_none());
    assert!(!dir.path().join("RAxML_info.seqs.faa").exists());
    Ok(())
}

#[test]
fn test_stop_after_model_selection_with_fixed_model() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let mut opts = options(dir.path(), &input);
    opts.stop_after_model_selection = true;
    opts.model = Some("PROTGAMMAWAG".to_string());
    let ctx = RunContext::from_options(&opts).unwrap();
    let mut tools = FakeTools::default();

    let report = run_with(&ctx, &mut tools).expect("early exit is a success");

    assert_eq!(
        tools.tools_called(),
        vec![Tool::Aligner, Tool::BlockFilter, Tool::FastaToPhylip]
    );
    assert_eq!(
        report.status_of(StageKind::ModelSelection),
        Some(&StageStatus::Skipped("model supplied"))
    );
    Ok(())
}

#[test]
fn test_fixed_model_passed_verbatim() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let mut opts = options(dir.path(), &input);
    opts.model = Some("PROTGAMMALG".to_string());
    let ctx = RunContext::from_options(&opts).unwrap();
    let mut tools = FakeTools::default();

    run_with(&ctx, &mut tools).expect("run should succeed");

    assert!(!tools.tools_called().contains(&Tool::ModelSelector));
    let tree_cmd = tools.calls.last().unwrap();
    assert!(tree_cmd.args.windows(2).any(|w| w[0] == "-m" && w[1] == "PROTGAMMALG"));
    Ok(())
}

#[test]
fn test_report_without_best_model_is_fatal() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools {
        model_report: "ProtTest 3.4\nsomething went wrong\n".to_string(),
        ..FakeTools::default()
    };

    assert!(matches!(
        run_with(&ctx, &mut tools),
        Err(PipelineError::NoBestModel { .. })
    ));
    assert!(!tools.tools_called().contains(&Tool::TreeBuilder));
    Ok(())
}

#[test]
fn test_mode_none_renames_instead_of_filtering() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let mut opts = options(dir.path(), &input);
    opts.mode = "none".to_string();
    let ctx = RunContext::from_options(&opts).unwrap();
    let mut tools = FakeTools::default();

    let report = run_with(&ctx, &mut tools).expect("run should succeed");

    assert!(!tools.tools_called().contains(&Tool::BlockFilter));
    assert!(report.block_filter.is_none());
    assert!(!dir.path().join("seqs.faa.tmp").exists());
    assert!(dir.path().join("seqs.faa.tmp.fst").exists());
    assert!(dir
        .path()
        .join("bestTree.seqs.faa_mode_none.renamed")
        .exists());
    Ok(())
}

#[test]
fn test_aligned_input_skips_aligner() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let mut opts = options(dir.path(), &input);
    opts.aligned_file = "T".to_string();
    let ctx = RunContext::from_options(&opts).unwrap();
    let mut tools = FakeTools::default();

    let report = run_with(&ctx, &mut tools).expect("run should succeed");

    assert!(!tools.tools_called().contains(&Tool::Aligner));
    assert_eq!(
        report.status_of(StageKind::Align),
        Some(&StageStatus::Substituted("input already aligned"))
    );
    assert_eq!(
        fs::read(dir.path().join("seqs.faa.al"))?,
        fs::read(dir.path().join("seqs.faa.rename"))?
    );
    Ok(())
}

#[test]
fn test_delete_intermediates_keeps_results() -> io::Result<()> {
    let (dir, input) = setup(FOUR_SEQS)?;
    let mut opts = options(dir.path(), &input);
    opts.delete_intermediates = true;
    let ctx = RunContext::from_options(&opts).unwrap();
    let mut tools = FakeTools::default();

    run_with(&ctx, &mut tools).expect("run should succeed");

    let mut left: Vec<String> = fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(
        left,
        vec![
            "bestTree.seqs.faa_mode_med.renamed".to_string(),
            "bipartitions.seqs.faa_mode_med.renamed".to_string(),
            "bipartitionsBranchLabels.seqs.faa_mode_med.renamed".to_string(),
            "seqs.faa".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn test_commands_never_embed_header_text() -> io::Result<()> {
    let (dir, input) = setup(">x; rm -rf / $(reboot)\nMK\n>y\nML\n")?;
    let ctx = RunContext::from_options(&options(dir.path(), &input)).unwrap();
    let mut tools = FakeTools::default();

    run_with(&ctx, &mut tools).expect("run should succeed");

    for cmd in &tools.calls {
        assert!(cmd.args.iter().all(|a| !a.contains("rm -rf")), "{}", cmd);
    }
    let best = fs::read_to_string(dir.path().join("bestTree.seqs.faa_mode_med.renamed"))?;
    assert_eq!(best, "(x_:0.1,y:0.2);\n");
    Ok(())
}
