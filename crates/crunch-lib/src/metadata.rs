//! Provenance record written next to a spring archive.
//!
//! The file is a JSON array with one entry per read (role, absolute path,
//! checksum, algorithm) and one entry for the archive itself:
//!
//! ```json
//! [
//!   {"file": "first_read", "path": "/d/s_R1_001.fastq.gz", "checksum": "…", "algorithm": "sha256"},
//!   {"file": "second_read", "path": "/d/s_R2_001.fastq.gz", "checksum": "…", "algorithm": "sha256"},
//!   {"file": "spring", "path": "/d/s.spring"}
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CrunchError, Result};
use crate::files;
use crate::integrity::{self, Algorithm};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    FirstRead,
    SecondRead,
    Spring,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub file: FileRole,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpringMetadata {
    pub entries: Vec<MetadataEntry>,
}

fn read_entry(path: &Path, role: FileRole, algorithm: Algorithm) -> Result<MetadataEntry> {
    Ok(MetadataEntry {
        file: role,
        path: path.to_path_buf(),
        checksum: Some(integrity::digest(path, algorithm)?),
        algorithm: Some(algorithm.to_string()),
    })
}

impl SpringMetadata {
    /// Hash both reads and record them together with the archive path.
    pub fn collect(first: &Path, second: &Path, spring: &Path, algorithm: Algorithm) -> Result<Self> {
        Ok(Self {
            entries: vec![
                read_entry(first, FileRole::FirstRead, algorithm)?,
                read_entry(second, FileRole::SecondRead, algorithm)?,
                MetadataEntry {
                    file: FileRole::Spring,
                    path: spring.to_path_buf(),
                    checksum: None,
                    algorithm: None,
                },
            ],
        })
    }

    fn entry(&self, role: FileRole) -> Option<&MetadataEntry> {
        self.entries.iter().find(|e| e.file == role)
    }

    pub fn checksum(&self, role: FileRole) -> Option<&str> {
        self.entry(role).and_then(|e| e.checksum.as_deref())
    }

    pub fn spring_path(&self) -> Option<&Path> {
        self.entry(FileRole::Spring).map(|e| e.path.as_path())
    }

    /// Write the record to `<archive stem>.json` and return that path.
    pub fn dump(&self) -> Result<PathBuf> {
        let spring = self
            .spring_path()
            .ok_or_else(|| CrunchError::io("metadata", std::io::Error::other("no spring entry")))?;
        let metadata_path = files::metadata_path(spring);
        info!("Dumping spring metadata to {}", metadata_path.display());

        let file = File::create(&metadata_path).map_err(|e| CrunchError::io(&metadata_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| CrunchError::io(&metadata_path, e))?;
        Ok(metadata_path)
    }
}
