use std::path::PathBuf;
use tracing::{error, info, warn};

use super::{check_checksum, expect_kind, remove_best_effort, require_absent, require_file};
use crate::cli::{CramDecompressConfig, SpringDecompressConfig};
use crate::error::{PreconditionError, Result};
use crate::files::{self, FileKind, FileRef};
use crate::tools::{AlignmentConverter, FastqCodec};

/// Decompress a spring archive into a FASTQ pair, returning the output paths.
///
/// Output names default to `<stem>_R1_001.fastq.gz`/`<stem>_R2_001.fastq.gz`.
/// When expected checksums are given, both outputs are verified and removed
/// again on a mismatch.
pub fn decompress_spring(
    codec: &dyn FastqCodec,
    config: &SpringDecompressConfig,
) -> Result<(PathBuf, PathBuf)> {
    let spring = FileRef::resolve(&config.spring_path)?;
    if !spring.is_file() {
        if !config.dry_run {
            return Err(PreconditionError::InputMissing(spring.path().to_path_buf()).into());
        }
        warn!("Could not find {}. Dry run! Continue", spring.path().display());
    }
    expect_kind(&spring, FileKind::SpringArchive);

    let (guessed_first, guessed_second) = files::fastq_outpaths(spring.path());
    if config.first.is_none() || config.second.is_none() {
        warn!("No filenames provided. Guess fastq file names");
    }
    let first = FileRef::resolve(config.first.clone().unwrap_or(guessed_first))?;
    let second = FileRef::resolve(config.second.clone().unwrap_or(guessed_second))?;
    if first.path().exists() || second.path().exists() {
        error!("Outpath(s) already exists! Specify new with '-f', '-s'");
    }
    require_absent(first.path())?;
    require_absent(second.path())?;

    if config.dry_run {
        info!(
            "Dry run! Would decompress {} into {} and {}",
            spring.path().display(),
            first.path().display(),
            second.path().display()
        );
        return Ok((first.path().to_path_buf(), second.path().to_path_buf()));
    }

    info!(
        "Decompress spring archive {} to {} and {}",
        spring.path().display(),
        first.path().display(),
        second.path().display()
    );
    if let Err(e) = codec.decompress(spring.path(), first.path(), second.path()) {
        for output in [&first, &second] {
            if output.path().exists() {
                remove_best_effort(output.path());
            }
        }
        return Err(e);
    }

    let Some((first_checksum, second_checksum)) = &config.checksums else {
        info!("Spring file decompressed");
        return Ok((first.path().to_path_buf(), second.path().to_path_buf()));
    };

    let verified = check_checksum(first.path(), first_checksum, config.algorithm)
        .and_then(|_| check_checksum(second.path(), second_checksum, config.algorithm));
    if let Err(e) = verified {
        error!("Uncompressed spring differ from given checksum");
        info!("Deleting decompressed fastq files");
        remove_best_effort(first.path());
        remove_best_effort(second.path());
        return Err(e);
    }

    info!("Spring file decompressed and verified");
    Ok((first.path().to_path_buf(), second.path().to_path_buf()))
}

/// Convert a CRAM file back to BAM. Returns the BAM path.
pub fn decompress_cram(
    converter: &dyn AlignmentConverter,
    config: &CramDecompressConfig,
) -> Result<PathBuf> {
    converter.self_check()?;
    let cram = FileRef::resolve(&config.cram_path)?;
    require_file(&cram)?;
    expect_kind(&cram, FileKind::Cram);
    let bam = match &config.bam_path {
        Some(path) => FileRef::resolve(path)?,
        None => FileRef::resolve(files::bam_outpath(cram.path()))?,
    };
    require_absent(bam.path())?;

    if config.dry_run {
        info!("Dry run! Would convert {} to {}", cram.path().display(), bam.path().display());
        return Ok(bam.path().to_path_buf());
    }

    if let Err(e) = converter.decompress(cram.path(), bam.path()) {
        if bam.path().exists() {
            remove_best_effort(bam.path());
        }
        return Err(e);
    }
    info!("Decompression successful");
    Ok(bam.path().to_path_buf())
}
