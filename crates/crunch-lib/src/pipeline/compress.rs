use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::{
    check_checksum, expect_kind, remove_best_effort, remove_original, require_absent,
    require_file, transition, CompressionReport, Stage,
};
use crate::cli::{BamCompressConfig, FastqCompressConfig};
use crate::error::{PreconditionError, Result};
use crate::files::{self, FileKind, FileRef};
use crate::integrity::{self, Algorithm};
use crate::metadata::{FileRole, SpringMetadata};
use crate::tools::{AlignmentConverter, FastqCodec};

/// Compress a FASTQ pair into a spring archive, optionally verifying the
/// archive by a full round trip.
///
/// On any failure after the archive was created, the archive (and a metadata
/// file written by this call) is removed again. Temporary decompressed files
/// never outlive the call.
pub fn compress_fastq(
    codec: &dyn FastqCodec,
    config: &FastqCompressConfig,
) -> Result<CompressionReport> {
    let first = FileRef::resolve(&config.first)?;
    let second = FileRef::resolve(&config.second)?;
    let spring = FileRef::resolve(&config.spring_path)?;
    let temp_first = files::spring_temp_path(first.path());
    let temp_second = files::spring_temp_path(second.path());

    require_file(&first)?;
    require_file(&second)?;
    expect_kind(&first, FileKind::Fastq);
    expect_kind(&second, FileKind::Fastq);
    require_absent(spring.path())?;
    if config.metadata_file {
        require_absent(&files::metadata_path(spring.path()))?;
    }
    if config.check_integrity {
        if temp_first == temp_second {
            return Err(PreconditionError::TempPathCollision(temp_first).into());
        }
        require_absent(&temp_first)?;
        require_absent(&temp_second)?;
    }

    let mut stage = Stage::Start;
    if config.dry_run {
        warn!("Dry run! No files will be created or deleted");
        info!(
            "Would compress {} and {} into {}",
            first.path().display(),
            second.path().display(),
            spring.path().display()
        );
        transition(stage, Stage::Done);
        return Ok(CompressionReport::dry_run(spring.path().to_path_buf()));
    }

    // Originals are hashed before the codec ever sees them
    let metadata = if config.metadata_file {
        Some(SpringMetadata::collect(
            first.path(),
            second.path(),
            spring.path(),
            config.algorithm,
        )?)
    } else {
        None
    };

    info!(
        "Compress files {}, {} with spring to {}",
        first.path().display(),
        second.path().display(),
        spring.path().display()
    );
    let run = match codec.compress(first.path(), second.path(), spring.path()) {
        Ok(run) => run,
        Err(e) => {
            if spring.path().exists() {
                remove_best_effort(spring.path());
            }
            return Err(e);
        }
    };
    stage = transition(stage, Stage::Compressed);

    let metadata_path = match metadata.as_ref().map(SpringMetadata::dump).transpose() {
        Ok(path) => path,
        Err(e) => {
            remove_best_effort(spring.path());
            return Err(e);
        }
    };

    let mut report = CompressionReport {
        archive: spring.path().to_path_buf(),
        metadata: metadata_path,
        verified: false,
        dry_run: false,
        originals_deleted: false,
        elapsed: run.elapsed,
    };

    if !config.check_integrity {
        transition(stage, Stage::Done);
        info!("Compression successful");
        return Ok(report);
    }

    stage = transition(stage, Stage::Verifying);
    let expected = metadata.as_ref().map(|m| {
        (
            m.checksum(FileRole::FirstRead).map(str::to_string),
            m.checksum(FileRole::SecondRead).map(str::to_string),
        )
    });
    let (expected_first, expected_second) = expected.unwrap_or((None, None));

    let verification = roundtrip(
        codec,
        spring.path(),
        [
            (first.path(), temp_first.as_path(), expected_first),
            (second.path(), temp_second.as_path(), expected_second),
        ],
        config.algorithm,
    );
    info!("Deleting decompressed spring files");
    remove_best_effort(&temp_first);
    remove_best_effort(&temp_second);

    if let Err(e) = verification {
        stage = transition(stage, Stage::VerificationFailed);
        error!("Uncompressed spring differ from original fastqs");
        info!("Deleting compressed spring file {}", spring.path().display());
        remove_best_effort(spring.path());
        if let Some(path) = &report.metadata {
            remove_best_effort(path);
        }
        transition(stage, Stage::Done);
        return Err(e);
    }

    stage = transition(stage, Stage::Verified);
    transition(stage, Stage::Done);
    info!("Files are identical, compression successful");
    report.verified = true;
    Ok(report)
}

/// Decompress `spring` into the temp paths and compare each against its
/// original (or its checksum recorded before compression).
fn roundtrip(
    codec: &dyn FastqCodec,
    spring: &Path,
    mates: [(&Path, &Path, Option<String>); 2],
    algorithm: Algorithm,
) -> Result<()> {
    let [(_, temp_first, _), (_, temp_second, _)] = &mates;
    info!(
        "De-compressing spring file {} into {} and {}",
        spring.display(),
        temp_first.display(),
        temp_second.display()
    );
    codec.decompress(spring, temp_first, temp_second)?;

    for (original, temp, expected) in mates {
        verify_mate(original, temp, expected, algorithm)?;
    }
    Ok(())
}

fn verify_mate(
    original: &Path,
    decompressed: &Path,
    expected: Option<String>,
    algorithm: Algorithm,
) -> Result<()> {
    info!(
        "Check integrity of {} and {}",
        original.display(),
        decompressed.display()
    );
    let expected = match expected {
        Some(checksum) => checksum,
        None => integrity::digest(original, algorithm)?,
    };
    check_checksum(decompressed, &expected, algorithm)
}

/// Compress with integrity check and, only once the archive is verified,
/// delete both original mates.
pub fn compress_and_delete(
    codec: &dyn FastqCodec,
    config: &FastqCompressConfig,
) -> Result<CompressionReport> {
    let config = FastqCompressConfig {
        check_integrity: true,
        ..config.clone()
    };
    let mut report = compress_fastq(codec, &config)?;
    let originals = [FileRef::resolve(&config.first)?, FileRef::resolve(&config.second)?];

    if report.dry_run {
        for original in &originals {
            info!("Dry run, would delete {}", original.path().display());
        }
        return Ok(report);
    }
    if !report.verified {
        warn!("Archive {} is not verified, keeping originals", report.archive.display());
        return Ok(report);
    }

    info!("Safely deleting fastqs");
    for original in &originals {
        remove_original(original.path())?;
    }
    report.originals_deleted = true;
    Ok(report)
}

/// Convert a BAM file to CRAM (and index it). Returns the CRAM path.
pub fn compress_bam(converter: &dyn AlignmentConverter, config: &BamCompressConfig) -> Result<PathBuf> {
    converter.self_check()?;
    let bam = FileRef::resolve(&config.bam_path)?;
    require_file(&bam)?;
    expect_kind(&bam, FileKind::Bam);
    let cram = match &config.cram_path {
        Some(path) => FileRef::resolve(path)?,
        None => FileRef::resolve(files::cram_outpath(bam.path()))?,
    };
    require_absent(cram.path())?;

    if config.dry_run {
        info!("Dry run! Would convert {} to {}", bam.path().display(), cram.path().display());
        return Ok(cram.path().to_path_buf());
    }

    if let Err(e) = converter.compress(bam.path(), cram.path()) {
        remove_best_effort(cram.path());
        let index = files::index_path(cram.path());
        if index.exists() {
            remove_best_effort(&index);
        }
        return Err(e);
    }
    info!("Compression successful");
    Ok(cram.path().to_path_buf())
}
