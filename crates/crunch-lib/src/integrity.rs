//! Content checksums for integrity checks.
//!
//! Gzipped inputs (`.gz`/`.gzip`) are hashed over their decompressed content so
//! that a gzipped FASTQ and a plain copy decompressed from an archive produce
//! the same digest.

use digest::Digest;
use flate2::read::MultiGzDecoder;
use md5::Md5;
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{CrunchError, Result};

/// Read size used while hashing
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Md5,
    Sha1,
    #[default]
    Sha256,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha1" => Ok(Algorithm::Sha1),
            "sha256" => Ok(Algorithm::Sha256),
            other => Err(format!("unknown checksum algorithm: {other}")),
        }
    }
}

/// A digest computed for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecksumRecord {
    pub algorithm: Algorithm,
    pub checksum: String,
    pub path: PathBuf,
}

// Either the raw file or its gunzipped content
enum ContentReader {
    Plain(BufReader<File>),
    Gzipped(MultiGzDecoder<BufReader<File>>),
}

impl Read for ContentReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            ContentReader::Plain(r) => r.read(buf),
            ContentReader::Gzipped(r) => r.read(buf),
        }
    }
}

fn is_gzip_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("gz") | Some("gzip")
    )
}

fn open_content(path: &Path) -> Result<ContentReader> {
    let file = File::open(path).map_err(|e| CrunchError::io(path, e))?;
    let buffered = BufReader::with_capacity(CHUNK_SIZE, file);
    if is_gzip_path(path) {
        debug!("Unzip {} before computing checksum", path.display());
        Ok(ContentReader::Gzipped(MultiGzDecoder::new(buffered)))
    } else {
        Ok(ContentReader::Plain(buffered))
    }
}

fn hash_stream<D: Digest>(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().iter().map(|b| format!("{b:02x}")).collect())
}

/// Hex digest of the (decompressed, for gzip suffixes) content of `path`.
pub fn digest(path: &Path, algorithm: Algorithm) -> Result<String> {
    info!("Create {} checksum for {}", algorithm, path.display());
    let mut reader = open_content(path)?;
    let hex = match algorithm {
        Algorithm::Md5 => hash_stream::<Md5>(&mut reader),
        Algorithm::Sha1 => hash_stream::<Sha1>(&mut reader),
        Algorithm::Sha256 => hash_stream::<Sha256>(&mut reader),
    }
    .map_err(|e| CrunchError::io(path, e))?;
    debug!("{} {}", hex, path.display());
    Ok(hex)
}

pub fn checksum_record(path: &Path, algorithm: Algorithm) -> Result<ChecksumRecord> {
    Ok(ChecksumRecord {
        algorithm,
        checksum: digest(path, algorithm)?,
        path: path.to_path_buf(),
    })
}

/// True when every element is identical. A single element always compares
/// equal; an empty slice has nothing to agree on and compares unequal.
pub fn compare<S: AsRef<str>>(checksums: &[S]) -> bool {
    match checksums.split_first() {
        Some((first, rest)) => rest.iter().all(|c| c.as_ref() == first.as_ref()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        assert_eq!(
            digest(&path, Algorithm::Md5).unwrap(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            digest(&path, Algorithm::Sha1).unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            digest(&path, Algorithm::Sha256).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reads.fastq");
        std::fs::write(&path, "@r1\nACGT\n+\nIIII\n".repeat(5000)).unwrap();

        for algorithm in [Algorithm::Md5, Algorithm::Sha1, Algorithm::Sha256] {
            let a = digest(&path, algorithm).unwrap();
            let b = digest(&path, algorithm).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_gzip_hashed_over_content() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("reads.fastq");
        let gzipped = dir.path().join("reads.fastq.gz");
        let content = b"@r1\nACGTACGT\n+\nIIIIIIII\n";
        std::fs::write(&plain, content).unwrap();

        let mut encoder = GzEncoder::new(File::create(&gzipped).unwrap(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();

        assert_eq!(
            digest(&plain, Algorithm::Sha256).unwrap(),
            digest(&gzipped, Algorithm::Sha256).unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = digest(&dir.path().join("nope.txt"), Algorithm::Md5).unwrap_err();
        assert!(matches!(err, CrunchError::Io { .. }));
    }

    #[test]
    fn test_compare() {
        assert!(compare(&["x"]));
        assert!(compare(&["x", "x"]));
        assert!(!compare(&["x", "y"]));
        assert!(!compare::<&str>(&[]));
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("md5".parse::<Algorithm>().unwrap(), Algorithm::Md5);
        assert_eq!("SHA1".parse::<Algorithm>().unwrap(), Algorithm::Sha1);
        assert_eq!(Algorithm::default(), Algorithm::Sha256);
        assert!("crc32".parse::<Algorithm>().is_err());
    }
}
