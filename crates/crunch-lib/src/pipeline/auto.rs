use std::path::PathBuf;
use tracing::{info, info_span, warn};

use super::{compress_and_delete, require_file};
use crate::cli::{AutoConfig, AutoTarget, FastqCompressConfig};
use crate::error::{CrunchError, PreconditionError, Result};
use crate::files::{self, FileRef, ReadPair};
use crate::tools::FastqCodec;

#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Archives that were created, verified and had their originals removed
    pub succeeded: Vec<PathBuf>,
    /// Archives that could not be produced, with the reason
    pub failed: Vec<(PathBuf, CrunchError)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Compress, verify and delete the originals of every selected pair.
///
/// Pairs are processed one after another. A failing pair is logged and
/// recorded in the summary; the remaining pairs still run.
pub fn auto(codec: &dyn FastqCodec, config: &AutoConfig) -> Result<BatchSummary> {
    let pairs: Box<dyn Iterator<Item = ReadPair>> = match &config.target {
        AutoTarget::Directory(dir) => {
            if !dir.exists() {
                return Err(PreconditionError::InputMissing(dir.clone()).into());
            }
            if !dir.is_dir() {
                warn!("Please specify a directory");
                return Err(PreconditionError::NotADirectory(dir.clone()).into());
            }
            info!("This will recursively compress and delete fastqs in {}", dir.display());
            Box::new(files::find_fastq_pairs(dir))
        }
        AutoTarget::Pair {
            first,
            second,
            spring_path,
        } => {
            require_file(&FileRef::resolve(first)?)?;
            require_file(&FileRef::resolve(second)?)?;
            Box::new(std::iter::once(ReadPair {
                first: first.clone(),
                second: second.clone(),
                archive: spring_path.clone(),
            }))
        }
    };

    let mut summary = BatchSummary::default();
    for pair in pairs {
        let span = info_span!("pair", archive = %pair.archive.display());
        let _guard = span.enter();
        info!(
            "Compressing {} and {} into {}",
            pair.first.display(),
            pair.second.display(),
            pair.archive.display()
        );
        let job = FastqCompressConfig {
            first: pair.first,
            second: pair.second,
            spring_path: pair.archive.clone(),
            check_integrity: true,
            metadata_file: config.metadata_file,
            algorithm: config.algorithm,
            dry_run: config.dry_run,
        };
        match compress_and_delete(codec, &job) {
            Ok(_) => summary.succeeded.push(pair.archive),
            Err(e) => {
                warn!("{}", e);
                warn!("Skip current and continue auto");
                summary.failed.push((pair.archive, e));
            }
        }
    }

    info!(
        "Processed {} pairs: {} succeeded, {} failed",
        summary.total(),
        summary.succeeded.len(),
        summary.failed.len()
    );
    Ok(summary)
}
