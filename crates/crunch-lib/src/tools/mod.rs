//! Wrappers around the external binaries.
//!
//! [`Process`] owns the spawn/capture logic; the tool adapters compose it and
//! expose narrow capability traits so the pipelines can be driven by mocks.

pub mod process;
pub mod samtools;
pub mod spring;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub use process::{Invocation, Process, ToolOutput};
pub use samtools::SamtoolsProcess;
pub use spring::SpringProcess;

/// Wall time a codec reported for its own run.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ElapsedTime {
    Seconds(String),
    #[default]
    Unknown,
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElapsedTime::Seconds(s) => write!(f, "{s} s"),
            ElapsedTime::Unknown => f.write_str("unknown"),
        }
    }
}

/// Summary of a successful codec call.
#[derive(Clone, Debug, Default)]
pub struct CodecRun {
    pub elapsed: ElapsedTime,
}

/// Compresses a FASTQ mate pair into one archive and back.
pub trait FastqCodec {
    fn compress(&self, first: &Path, second: &Path, archive: &Path) -> Result<CodecRun>;

    fn decompress(&self, archive: &Path, first: &Path, second: &Path) -> Result<CodecRun>;
}

/// Converts between BAM and reference-compressed CRAM.
pub trait AlignmentConverter {
    /// Fails fast when the reference genome is unusable.
    fn self_check(&self) -> Result<()>;

    /// Convert `bam` to `cram` and index the result.
    fn compress(&self, bam: &Path, cram: &Path) -> Result<()>;

    fn decompress(&self, cram: &Path, bam: &Path) -> Result<()>;

    /// Index an alignment file, returning the index path.
    fn index(&self, path: &Path) -> Result<PathBuf>;
}
