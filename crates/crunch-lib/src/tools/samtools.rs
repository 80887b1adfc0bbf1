use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{AlignmentConverter, Process};
use crate::cli::CramConfig;
use crate::error::{ConfigurationError, Result};
use crate::files;

/// samtools, used for BAM <-> CRAM conversion and indexing.
#[derive(Clone, Debug)]
pub struct SamtoolsProcess {
    process: Process,
    reference: Option<PathBuf>,
}

impl SamtoolsProcess {
    pub fn new(config: &CramConfig) -> Self {
        Self {
            process: Process::new(&config.binary),
            reference: config.reference.clone(),
        }
    }

    fn reference(&self) -> Result<&Path> {
        let reference = self
            .reference
            .as_deref()
            .ok_or(ConfigurationError::ReferenceNotConfigured)?;
        if !reference.exists() {
            return Err(ConfigurationError::ReferenceMissing(reference.to_path_buf()).into());
        }
        Ok(reference)
    }

    pub fn compress_args(&self, bam: &Path, cram: &Path) -> Result<Vec<OsString>> {
        Ok(vec![
            "view".into(),
            "-C".into(),
            "-T".into(),
            self.reference()?.into(),
            bam.into(),
            "-o".into(),
            cram.into(),
        ])
    }

    pub fn decompress_args(&self, cram: &Path, bam: &Path) -> Result<Vec<OsString>> {
        Ok(vec![
            "view".into(),
            "-b".into(),
            "-o".into(),
            bam.into(),
            "-T".into(),
            self.reference()?.into(),
            cram.into(),
        ])
    }
}

impl AlignmentConverter for SamtoolsProcess {
    fn self_check(&self) -> Result<()> {
        let reference = self.reference()?;
        info!("Using reference genome {}", reference.display());
        Ok(())
    }

    fn compress(&self, bam: &Path, cram: &Path) -> Result<()> {
        info!("Converting bam {} to cram {}", bam.display(), cram.display());
        self.process.run(self.compress_args(bam, cram)?)?;
        self.index(cram)?;
        Ok(())
    }

    fn decompress(&self, cram: &Path, bam: &Path) -> Result<()> {
        info!("Converting cram {} to bam {}", cram.display(), bam.display());
        self.process.run(self.decompress_args(cram, bam)?)?;
        Ok(())
    }

    fn index(&self, path: &Path) -> Result<PathBuf> {
        let index = files::index_path(path);
        info!("Creating index {} for {}", index.display(), path.display());
        self.process
            .run([OsStr::new("index"), path.as_os_str(), index.as_os_str()])?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrunchError;
    use tempfile::TempDir;

    fn samtools(reference: Option<PathBuf>) -> SamtoolsProcess {
        SamtoolsProcess::new(&CramConfig {
            binary: PathBuf::from("samtools"),
            reference,
        })
    }

    #[test]
    fn test_self_check_not_configured() {
        let err = samtools(None).self_check().unwrap_err();
        assert!(matches!(
            err,
            CrunchError::Configuration(ConfigurationError::ReferenceNotConfigured)
        ));
    }

    #[test]
    fn test_self_check_missing_reference() {
        let dir = TempDir::new().unwrap();
        let err = samtools(Some(dir.path().join("genome.fasta")))
            .self_check()
            .unwrap_err();
        assert!(matches!(
            err,
            CrunchError::Configuration(ConfigurationError::ReferenceMissing(_))
        ));
    }

    #[test]
    fn test_view_args() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("genome.fasta");
        std::fs::write(&reference, ">chr1\nACGT\n").unwrap();
        let tool = samtools(Some(reference.clone()));
        tool.self_check().unwrap();

        let args = tool
            .compress_args(Path::new("a.bam"), Path::new("a.cram"))
            .unwrap();
        let expected: Vec<OsString> = vec![
            "view".into(),
            "-C".into(),
            "-T".into(),
            reference.clone().into(),
            "a.bam".into(),
            "-o".into(),
            "a.cram".into(),
        ];
        assert_eq!(args, expected);

        let args = tool
            .decompress_args(Path::new("a.cram"), Path::new("a.bam"))
            .unwrap();
        assert_eq!(args[0], "view");
        assert_eq!(args[1], "-b");
        assert_eq!(args[3], "a.bam");
        assert_eq!(args[5], reference.into_os_string());
        assert_eq!(args[6], "a.cram");
    }
}
