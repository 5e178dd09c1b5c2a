// Removal of intermediate artifacts after a successful run

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::defaults::{
    ALIGNED_SUFFIX, FILTERED_SUFFIX, INTERMEDIATE_SUFFIX, MODEL_SELECTOR_SNAPSHOT_DIR,
    MODEL_SUFFIX, PHYLIP_REDUCED_SUFFIX, PHYLIP_SUFFIX, RENAME_SUFFIX,
    TREE_BUILDER_OUTPUT_PREFIXES,
};
use crate::run_opt::RunContext;

const INTERMEDIATE_SUFFIXES: [&str; 7] = [
    RENAME_SUFFIX,
    ALIGNED_SUFFIX,
    INTERMEDIATE_SUFFIX,
    FILTERED_SUFFIX,
    PHYLIP_SUFFIX,
    PHYLIP_REDUCED_SUFFIX,
    MODEL_SUFFIX,
];

/// Every file the run leaves behind except the renamed trees.
pub fn intermediate_files(ctx: &RunContext) -> Vec<PathBuf> {
    INTERMEDIATE_SUFFIXES
        .iter()
        .map(|suffix| ctx.artifact_path(suffix))
        .chain(
            TREE_BUILDER_OUTPUT_PREFIXES
                .iter()
                .map(|prefix| ctx.work_path(format!("{}{}", prefix, ctx.basename))),
        )
        .collect()
}

/// Delete intermediate files and the model selector's snapshot directory.
///
/// Absent files are fine; any other failure is logged and skipped. Returns
/// the number of entries removed.
pub fn remove_intermediates(ctx: &RunContext) -> usize {
    log::info!("Removing intermediate files");
    let mut removed = 0;

    for path in intermediate_files(ctx) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove {}: {}", path.display(), e),
        }
    }

    let snapshot = ctx.work_path(MODEL_SELECTOR_SNAPSHOT_DIR);
    match fs::remove_dir_all(&snapshot) {
        Ok(()) => removed += 1,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove {}: {}", snapshot.display(), e),
    }

    log::debug!("Removed {} intermediate entries", removed);
    removed
}
