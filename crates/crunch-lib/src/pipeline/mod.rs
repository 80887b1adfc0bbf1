//! Integrity-gated compression workflows.
//!
//! A FASTQ pair moves through [`Stage`]s: it is compressed, optionally
//! decompressed into temporary siblings and compared by checksum, and the
//! archive is kept only if that comparison succeeds. Originals are deleted
//! only after a verified run ([`compress_and_delete`]).

mod auto;
mod compress;
mod decompress;

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{CrunchError, PreconditionError, Result};
use crate::files::{FileKind, FileRef};
use crate::integrity::{self, Algorithm};
use crate::tools::ElapsedTime;

pub use auto::{auto, BatchSummary};
pub use compress::{compress_and_delete, compress_bam, compress_fastq};
pub use decompress::{decompress_cram, decompress_spring};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Start,
    Compressed,
    Verifying,
    Verified,
    VerificationFailed,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Compressed => "compressed",
            Stage::Verifying => "verifying",
            Stage::Verified => "verified",
            Stage::VerificationFailed => "verification failed",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful [`compress_fastq`] run.
#[derive(Clone, Debug)]
pub struct CompressionReport {
    pub archive: PathBuf,
    pub metadata: Option<PathBuf>,
    /// The archive was decompressed and matched the originals
    pub verified: bool,
    /// Nothing was written, invoked or deleted
    pub dry_run: bool,
    /// The original mates were removed
    pub originals_deleted: bool,
    pub elapsed: ElapsedTime,
}

impl CompressionReport {
    fn dry_run(archive: PathBuf) -> Self {
        Self {
            archive,
            metadata: None,
            verified: false,
            dry_run: true,
            originals_deleted: false,
            elapsed: ElapsedTime::Unknown,
        }
    }
}

fn transition(from: Stage, to: Stage) -> Stage {
    debug!("Pipeline stage {} -> {}", from, to);
    to
}

fn require_file(file: &FileRef) -> Result<()> {
    if !file.is_file() {
        warn!("Could not find file {}", file.path().display());
        return Err(PreconditionError::InputMissing(file.path().to_path_buf()).into());
    }
    Ok(())
}

fn expect_kind(file: &FileRef, kind: FileKind) {
    if file.kind() != kind {
        warn!("{} does not look like a {:?} file", file.path().display(), kind);
    }
}

fn require_absent(path: &Path) -> Result<()> {
    if path.exists() {
        warn!("Outfile {} already exists", path.display());
        return Err(PreconditionError::OutputExists(path.to_path_buf()).into());
    }
    Ok(())
}

/// Compare the digest of `path` with a checksum computed earlier.
fn check_checksum(path: &Path, expected: &str, algorithm: Algorithm) -> Result<()> {
    let actual = integrity::digest(path, algorithm)?;
    if !integrity::compare(&[expected, actual.as_str()]) {
        warn!("Checksum of {} is NOT the same as {}", path.display(), expected);
        return Err(CrunchError::Verification {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    info!("All checksums are the same");
    Ok(())
}

/// Remove a working artifact. A missing file is only worth a warning.
fn remove_best_effort(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!("{} deleted", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Could not find file {}", path.display())
        }
        Err(e) => warn!("Could not delete {}: {}", path.display(), e),
    }
}

/// Remove a user file. Failing to do so is an error, except when it is
/// already gone.
fn remove_original(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("{} deleted", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Could not find file {}", path.display());
            Ok(())
        }
        Err(e) => Err(CrunchError::io(path, e)),
    }
}
