use std::path::PathBuf;

use crate::integrity::Algorithm;

/// Default number of threads handed to SPRING.
pub const DEFAULT_THREADS: usize = 8;

#[derive(Clone, Debug)]
pub struct SpringConfig {
    /// Path to the spring binary
    pub binary: PathBuf,
    /// Number of threads spring may use internally
    pub threads: usize,
    /// Working directory override for spring's temporary files
    pub tmp_dir: Option<PathBuf>,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("spring"),
            threads: DEFAULT_THREADS,
            tmp_dir: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CramConfig {
    /// Path to the samtools binary
    pub binary: PathBuf,
    /// Reference genome used for CRAM encoding and decoding
    pub reference: Option<PathBuf>,
}

impl Default for CramConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("samtools"),
            reference: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FastqCompressConfig {
    /// First read in pair
    pub first: PathBuf,
    /// Second read in pair
    pub second: PathBuf,
    /// Output spring archive
    pub spring_path: PathBuf,
    /// Decompress the fresh archive and compare checksums with the originals
    pub check_integrity: bool,
    /// Write checksums of the originals to `<archive stem>.json`
    pub metadata_file: bool,
    /// Digest used for integrity checks and metadata
    pub algorithm: Algorithm,
    /// Validate and log only
    pub dry_run: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SpringDecompressConfig {
    /// Input spring archive
    pub spring_path: PathBuf,
    /// Output for the first read; guessed from the archive name when unset
    pub first: Option<PathBuf>,
    /// Output for the second read; guessed from the archive name when unset
    pub second: Option<PathBuf>,
    /// Expected checksums of (first, second); both must be set to verify
    pub checksums: Option<(String, String)>,
    pub algorithm: Algorithm,
    pub dry_run: bool,
}

#[derive(Clone, Debug, Default)]
pub struct BamCompressConfig {
    pub bam_path: PathBuf,
    /// Output CRAM; `<bam stem>.cram` when unset
    pub cram_path: Option<PathBuf>,
    pub dry_run: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CramDecompressConfig {
    pub cram_path: PathBuf,
    /// Output BAM; `<cram stem>.bam` when unset
    pub bam_path: Option<PathBuf>,
    pub dry_run: bool,
}

/// Which pairs an `auto` run should process.
#[derive(Clone, Debug)]
pub enum AutoTarget {
    /// Every read pair found recursively below a directory
    Directory(PathBuf),
    /// One explicit pair and its archive
    Pair {
        first: PathBuf,
        second: PathBuf,
        spring_path: PathBuf,
    },
}

#[derive(Clone, Debug)]
pub struct AutoConfig {
    pub target: AutoTarget,
    pub algorithm: Algorithm,
    pub metadata_file: bool,
    pub dry_run: bool,
}
