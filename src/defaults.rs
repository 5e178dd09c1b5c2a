// src/defaults.rs

// Tool invocations used when no alternate tool directory is given
pub const ALIGNER: &str = "muscle";
pub const FASTA_TO_PHYLIP: &str = "/opt/scripts/bin/fasta_fastq/fasta2phy";
pub const BLOCK_FILTER: &str = "Gblocks";
pub const JAVA: &str = "java";
pub const MODEL_SELECTOR_JAR: &str = "/opt/prottest-3.4-20140123/prottest-3.4.jar";
pub const TREE_BUILDER: &str = "raxmlHPC-PTHREADS";

// File names looked up inside an alternate tool directory (--tools-dir)
pub const ALIGNER_FILE: &str = "muscle";
pub const FASTA_TO_PHYLIP_FILE: &str = "fasta2phy";
pub const BLOCK_FILTER_FILE: &str = "Gblocks";
pub const MODEL_SELECTOR_JAR_FILE: &str = "prottest-3.4-20140123/prottest-3.4.jar";
pub const TREE_BUILDER_FILE: &str = "raxmlHPC-PTHREADS";

// RAxML parsimony (-p) and rapid bootstrap (-x) seed
pub const RAXML_SEED: u64 = 1234;

// Header sentinel for FASTA records
pub const HEADER_SENTINEL: char = '>';
// Synthetic identifier prefix: g_0, g_1, ...
pub const SYNTHETIC_PREFIX: &str = "g_";

// Intermediate artifact suffixes (<input><suffix>)
pub const RENAME_SUFFIX: &str = ".rename";
pub const ALIGNED_SUFFIX: &str = ".al";
pub const INTERMEDIATE_SUFFIX: &str = ".tmp";
pub const FILTERED_SUFFIX: &str = ".tmp.fst";
pub const PHYLIP_SUFFIX: &str = ".phy";
pub const PHYLIP_REDUCED_SUFFIX: &str = ".phy.reduced";
pub const MODEL_SUFFIX: &str = ".model";

// Files the tree builder writes for run name <input>: <prefix><input>
pub const BEST_TREE_PREFIX: &str = "RAxML_bestTree.";
pub const BIPARTITIONS_BRANCH_LABELS_PREFIX: &str = "RAxML_bipartitionsBranchLabels.";
pub const BIPARTITIONS_PREFIX: &str = "RAxML_bipartitions.";
pub const BOOTSTRAP_PREFIX: &str = "RAxML_bootstrap.";
pub const INFO_PREFIX: &str = "RAxML_info.";
pub const TREE_BUILDER_OUTPUT_PREFIXES: [&str; 5] = [
    BEST_TREE_PREFIX,
    BIPARTITIONS_BRANCH_LABELS_PREFIX,
    BIPARTITIONS_PREFIX,
    BOOTSTRAP_PREFIX,
    INFO_PREFIX,
];

// Directory the model selector leaves behind in the working directory
pub const MODEL_SELECTOR_SNAPSHOT_DIR: &str = "snapshot";

// Intermediate files are kept unless --delete-intermediates is given
pub const DELETE_INTERMEDIATES: bool = false;

// Other Constants
pub const VERBOSITY: i32 = 3;
