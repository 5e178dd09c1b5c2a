//! Output tree renaming
//!
//! After tree construction, the trees written by RAxML still carry the
//! synthetic `g_<i>` labels. Each tree artifact is decoded with the run's
//! [`IdentifierMap`] and written to `<kind>.<input>_mode_<mode>.renamed`.
//!
//! The best tree is mandatory: if it is absent after a successful tree
//! build, the run aborts with [`PipelineError::MissingArtifact`] and nothing
//! is written. The two bipartition trees only exist for some bootstrap
//! configurations, so problems with them are reported and skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::defaults::{BEST_TREE_PREFIX, BIPARTITIONS_BRANCH_LABELS_PREFIX, BIPARTITIONS_PREFIX};
use crate::error::{PipelineError, Result};
use crate::identifier::{ambiguous_labels, decode, IdentifierMap};
use crate::run_opt::{Mode, RunContext};
use crate::stages::{Fatality, StageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeArtifact {
    BestTree,
    BipartitionsBranchLabels,
    Bipartitions,
}

impl TreeArtifact {
    /// Processing order; the mandatory best tree comes first.
    pub const ALL: [TreeArtifact; 3] = [
        TreeArtifact::BestTree,
        TreeArtifact::BipartitionsBranchLabels,
        TreeArtifact::Bipartitions,
    ];

    pub fn kind(self) -> &'static str {
        match self {
            TreeArtifact::BestTree => "bestTree",
            TreeArtifact::BipartitionsBranchLabels => "bipartitionsBranchLabels",
            TreeArtifact::Bipartitions => "bipartitions",
        }
    }

    pub fn fatality(self) -> Fatality {
        match self {
            TreeArtifact::BestTree => Fatality::Fatal,
            _ => Fatality::Advisory,
        }
    }

    /// File written by the tree builder for run name `basename`.
    pub fn source_name(self, basename: &str) -> String {
        let prefix = match self {
            TreeArtifact::BestTree => BEST_TREE_PREFIX,
            TreeArtifact::BipartitionsBranchLabels => BIPARTITIONS_BRANCH_LABELS_PREFIX,
            TreeArtifact::Bipartitions => BIPARTITIONS_PREFIX,
        };
        format!("{}{}", prefix, basename)
    }

    /// `<kind>.<input>_mode_<mode>.renamed`
    pub fn renamed_name(self, basename: &str, mode: Mode) -> String {
        format!("{}.{}_mode_{}.renamed", self.kind(), basename, mode.label())
    }
}

impl fmt::Display for TreeArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// A non-fatal problem with an optional tree artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactIssue {
    pub artifact: TreeArtifact,
    pub path: PathBuf,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    /// Renamed trees, in processing order.
    pub written: Vec<PathBuf>,
    pub issues: Vec<ArtifactIssue>,
    /// Synthetic ids seen in any tree without a map entry.
    pub unmapped: BTreeSet<usize>,
    /// Labels that are empty or shared by several sequences, with their ids.
    pub ambiguous_labels: BTreeMap<String, Vec<usize>>,
}

/// Decode `source` with `map` into `dest`. Returns the ids that had no map entry.
pub fn rename_tree_file(source: &Path, dest: &Path, map: &IdentifierMap) -> io::Result<BTreeSet<usize>> {
    let tree = fs::read_to_string(source)?;
    let (renamed, stats) = decode(&tree, map);
    fs::write(dest, renamed)?;
    log::debug!(
        "{}: restored {} labels into {}",
        source.display(),
        stats.replaced,
        dest.display()
    );
    Ok(stats.unmapped)
}

/// Restore original names in every tree artifact of the run.
pub fn rename_trees(ctx: &RunContext, map: &IdentifierMap) -> Result<RenameReport> {
    let mut report = RenameReport {
        ambiguous_labels: ambiguous_labels(map),
        ..RenameReport::default()
    };
    for (label, ids) in &report.ambiguous_labels {
        if label.is_empty() {
            log::warn!("Sequences {:?} have empty headers; their tree leaves will be unnamed", ids);
        } else {
            log::warn!("Sequences {:?} all restore to the label '{}' in output trees", ids, label);
        }
    }

    for artifact in TreeArtifact::ALL {
        let source = ctx.work_path(artifact.source_name(&ctx.basename));
        let dest = ctx.work_path(artifact.renamed_name(&ctx.basename, ctx.mode));
        log::info!("Renaming {} tree to use original names", artifact);

        match rename_tree_file(&source, &dest, map) {
            Ok(unmapped) => {
                if !unmapped.is_empty() {
                    log::warn!(
                        "{}: {} synthetic ids have no original name: {:?}",
                        source.display(),
                        unmapped.len(),
                        unmapped
                    );
                }
                report.unmapped.extend(unmapped);
                report.written.push(dest);
            }
            Err(e) => match artifact.fatality() {
                Fatality::Fatal if e.kind() == io::ErrorKind::NotFound => {
                    return Err(PipelineError::MissingArtifact {
                        stage: StageKind::TreeBuild,
                        path: source,
                    });
                }
                Fatality::Fatal => return Err(PipelineError::io(source, e)),
                Fatality::Advisory => {
                    let detail = if e.kind() == io::ErrorKind::NotFound {
                        "not produced by the tree builder".to_string()
                    } else {
                        e.to_string()
                    };
                    log::warn!("Skipping {} tree {}: {}", artifact, source.display(), detail);
                    report.issues.push(ArtifactIssue {
                        artifact,
                        path: source,
                        detail,
                    });
                }
            },
        }
    }

    Ok(report)
}
