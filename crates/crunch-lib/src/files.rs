//! File naming conventions and read pair discovery.
//!
//! Pairs follow the Illumina naming scheme
//! `{sample}_{R1|R2}_{lane/suffix}`, e.g.
//! `CPCT12345678R_HJJLGCCXX_S1_L001_R1_001.fastq.gz`; the archive for such a
//! pair is `CPCT12345678R_HJJLGCCXX_S1_L001.spring` in the same directory.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{CrunchError, Result};

pub const SPRING_SUFFIX: &str = "spring";
/// Extension given to FASTQs decompressed for verification
pub const SPRING_TEMP_EXTENSION: &str = "spring.fastq";
const FASTQ_EXTENSIONS: [&str; 2] = ["fastq", "fq"];
const MATE_MARKERS: [&str; 2] = ["R1", "R2"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Fastq,
    SpringArchive,
    Bam,
    Cram,
    Other,
}

impl FileKind {
    pub fn infer(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(SPRING_SUFFIX) => FileKind::SpringArchive,
            Some("bam") => FileKind::Bam,
            Some("cram") => FileKind::Cram,
            _ if has_fastq_extension(path) => FileKind::Fastq,
            _ => FileKind::Other,
        }
    }
}

/// An absolute path together with the kind of file its name implies.
#[derive(Clone, Debug)]
pub struct FileRef {
    path: PathBuf,
    kind: FileKind,
}

impl FileRef {
    /// Make `path` absolute (relative to the current directory) without
    /// touching the filesystem.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path = std::path::absolute(path).map_err(|e| CrunchError::io(path, e))?;
        let kind = FileKind::infer(&path);
        Ok(Self { path, kind })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.path.is_file()
    }
}

impl PartialEq for FileRef {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileRef {}

impl AsRef<Path> for FileRef {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Two mates of a paired-end run plus the archive they compress into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReadPair {
    pub first: PathBuf,
    pub second: PathBuf,
    pub archive: PathBuf,
}

/// True if any dot-separated component after the first is `fastq` or `fq`.
pub fn has_fastq_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.split('.').skip(1).any(|ext| FASTQ_EXTENSIONS.contains(&ext)))
}

fn strip_extensions(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Archive path for a pair, derived from the first mate by dropping the last
/// two `_`-separated parts of its name.
///
/// Names with fewer than three parts have no mate marker to drop; their
/// extensions are replaced instead.
pub fn spring_outpath(first: &Path) -> PathBuf {
    let name = first
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parts: Vec<&str> = name.split('_').collect();
    let base = if parts.len() >= 3 {
        parts[..parts.len() - 2].join("_")
    } else {
        strip_extensions(&name).to_string()
    };
    let spring_path = first.with_file_name(format!("{base}.{SPRING_SUFFIX}"));
    debug!("Created spring path {}", spring_path.display());
    spring_path
}

/// Gzipped FASTQ outputs for an archive whose pair names were not given.
pub fn fastq_outpaths(spring: &Path) -> (PathBuf, PathBuf) {
    let stem = spring
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (
        spring.with_file_name(format!("{stem}_R1_001.fastq.gz")),
        spring.with_file_name(format!("{stem}_R2_001.fastq.gz")),
    )
}

pub fn cram_outpath(bam: &Path) -> PathBuf {
    bam.with_extension("cram")
}

pub fn bam_outpath(cram: &Path) -> PathBuf {
    cram.with_extension("bam")
}

/// Sibling file a mate is decompressed into during verification:
/// `x_R1_001.fastq.gz` -> `x_R1_001.fastq.spring.fastq`.
pub fn spring_temp_path(mate: &Path) -> PathBuf {
    mate.with_extension(SPRING_TEMP_EXTENSION)
}

/// Metadata file written next to an archive.
pub fn metadata_path(spring: &Path) -> PathBuf {
    spring.with_extension("json")
}

/// `.bai` appended to BAM files, `.crai` to anything else.
pub fn index_path(path: &Path) -> PathBuf {
    let suffix = if path.extension().is_some_and(|e| e == "bam") {
        ".bai"
    } else {
        ".crai"
    };
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Lazily yields every complete read pair below a directory.
///
/// Entries are visited in file-name order. Each pair is produced once, when
/// the first of its mates is reached and both mates exist.
pub struct FastqPairs {
    walker: walkdir::IntoIter,
    seen: HashSet<PathBuf>,
}

impl Iterator for FastqPairs {
    type Item = ReadPair;

    fn next(&mut self) -> Option<ReadPair> {
        for entry in self.walker.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !has_fastq_extension(path) || is_spring_temp(path) {
                continue;
            }
            if self.seen.contains(path) {
                debug!("Read already found: {}", path.display());
                continue;
            }
            if let Some(pair) = pair_for(path) {
                self.seen.insert(pair.first.clone());
                self.seen.insert(pair.second.clone());
                return Some(pair);
            }
        }
        None
    }
}

fn is_spring_temp(path: &Path) -> bool {
    path.to_string_lossy()
        .ends_with(&format!(".{SPRING_TEMP_EXTENSION}"))
}

fn pair_for(path: &Path) -> Option<ReadPair> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        warn!("Skipping non UTF-8 file name {}", path.display());
        return None;
    };
    let parts: Vec<&str> = name.split('_').collect();
    if parts.len() < 3 {
        warn!("{} does not follow the sample_R1_suffix naming convention", path.display());
        return None;
    }
    let marker = parts[parts.len() - 2];
    if !MATE_MARKERS.contains(&marker) {
        debug!("{} is not part of a read pair", path.display());
        return None;
    }
    let sample = parts[..parts.len() - 2].join("_");
    let tail = parts[parts.len() - 1];

    let first = path.with_file_name(format!("{sample}_R1_{tail}"));
    if !first.is_file() {
        warn!("Could not find first read in pair: {}", first.display());
        return None;
    }
    let second = path.with_file_name(format!("{sample}_R2_{tail}"));
    if !second.is_file() {
        warn!("Could not find second read in pair: {}", second.display());
        return None;
    }
    let archive = path.with_file_name(format!("{sample}.{SPRING_SUFFIX}"));
    Some(ReadPair {
        first,
        second,
        archive,
    })
}

/// Start a new pair search below `directory`.
pub fn find_fastq_pairs(directory: &Path) -> FastqPairs {
    info!("Find all pairs in {}", directory.display());
    FastqPairs {
        walker: WalkDir::new(directory).sort_by_file_name().into_iter(),
        seen: HashSet::new(),
    }
}
