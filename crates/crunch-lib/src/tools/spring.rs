use std::ffi::OsString;
use std::path::Path;
use tracing::{error, info, warn};

use super::{CodecRun, ElapsedTime, FastqCodec, Process, ToolOutput};
use crate::cli::SpringConfig;
use crate::error::{CrunchError, Result};

const COMPRESSION_MARKER: &str = "compression done";
const DECOMPRESSION_MARKER: &str = "decompression done";
const COMPRESSION_TIME: &str = "total time for compression";
const DECOMPRESSION_TIME: &str = "total time for decompression";

/// SPRING FASTQ compressor.
#[derive(Clone, Debug)]
pub struct SpringProcess {
    process: Process,
    threads: usize,
    tmp_dir: Option<std::path::PathBuf>,
}

fn ends_with_gz(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "gz")
}

/// True if any stdout line contains `marker`, ignoring case.
pub(crate) fn has_marker(output: &ToolOutput, marker: &str) -> bool {
    output
        .stdout_lines()
        .any(|line| line.to_lowercase().contains(marker))
}

/// Second-to-last token of the line mentioning `phrase`, e.g. `4` from
/// `total time for compression: 4 s`.
pub(crate) fn parse_elapsed(output: &ToolOutput, phrase: &str) -> ElapsedTime {
    output
        .stdout_lines()
        .find(|line| line.to_lowercase().contains(phrase))
        .and_then(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            tokens.len().checked_sub(2).map(|i| tokens[i].to_string())
        })
        .map_or(ElapsedTime::Unknown, ElapsedTime::Seconds)
}

impl SpringProcess {
    pub fn new(config: &SpringConfig) -> Self {
        Self {
            process: Process::new(&config.binary),
            threads: config.threads,
            tmp_dir: config.tmp_dir.clone(),
        }
    }

    pub fn compress_args(&self, first: &Path, second: &Path, archive: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-c".into(),
            "-i".into(),
            first.into(),
            second.into(),
            "-o".into(),
            archive.into(),
            "-t".into(),
            self.threads.to_string().into(),
        ];
        if ends_with_gz(first) {
            info!("File(s) are gzipped");
            args.push("-g".into());
        }
        self.push_working_dir(&mut args);
        args
    }

    pub fn decompress_args(&self, archive: &Path, first: &Path, second: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-d".into(),
            "-i".into(),
            archive.into(),
            "-o".into(),
            first.into(),
            second.into(),
        ];
        if ends_with_gz(first) {
            args.push("-g".into());
        }
        self.push_working_dir(&mut args);
        args
    }

    fn push_working_dir(&self, args: &mut Vec<OsString>) {
        if let Some(dir) = &self.tmp_dir {
            args.push("--working-dir".into());
            args.push(dir.into());
        }
    }

    fn run_checked(
        &self,
        args: Vec<OsString>,
        marker: &'static str,
        time_phrase: &str,
    ) -> Result<CodecRun> {
        let command = self.process.invocation(&args).to_string();
        let output = self.process.run(&args)?;

        if !has_marker(&output, marker) {
            error!("spring exited without reporting '{}'", marker);
            for line in output.stderr_lines() {
                error!("{}", line);
            }
            return Err(CrunchError::MissingMarker {
                command,
                marker,
                stderr: output.stderr,
            });
        }

        let elapsed = parse_elapsed(&output, time_phrase);
        if elapsed == ElapsedTime::Unknown {
            warn!("Could not find run time in spring output");
        }
        Ok(CodecRun { elapsed })
    }
}

impl FastqCodec for SpringProcess {
    fn compress(&self, first: &Path, second: &Path, archive: &Path) -> Result<CodecRun> {
        info!("Compressing fastq to spring");
        let run = self.run_checked(
            self.compress_args(first, second, archive),
            COMPRESSION_MARKER,
            COMPRESSION_TIME,
        )?;
        info!("Spring compression time: {}", run.elapsed);
        Ok(run)
    }

    fn decompress(&self, archive: &Path, first: &Path, second: &Path) -> Result<CodecRun> {
        info!("Decompressing spring compressed file");
        let run = self.run_checked(
            self.decompress_args(archive, first, second),
            DECOMPRESSION_MARKER,
            DECOMPRESSION_TIME,
        )?;
        info!("Spring decompression time: {}", run.elapsed);
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn output(stdout: &str) -> ToolOutput {
        #[cfg(unix)]
        let status = std::os::unix::process::ExitStatusExt::from_raw(0);
        #[cfg(windows)]
        let status = std::os::windows::process::ExitStatusExt::from_raw(0);
        ToolOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            status,
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_marker_is_case_insensitive() {
        let out = output("Compression done!\ntotal time for compression: 4 s");
        assert!(has_marker(&out, COMPRESSION_MARKER));
        assert!(!has_marker(&out, DECOMPRESSION_MARKER));
        assert!(!has_marker(&output("warning: low memory"), COMPRESSION_MARKER));
    }

    #[test]
    fn test_parse_elapsed() {
        let out = output("Compression done!\nTotal time for compression: 127 s");
        assert_eq!(
            parse_elapsed(&out, COMPRESSION_TIME),
            ElapsedTime::Seconds("127".into())
        );
        assert_eq!(parse_elapsed(&out, DECOMPRESSION_TIME), ElapsedTime::Unknown);
        assert_eq!(parse_elapsed(&output("done"), COMPRESSION_TIME), ElapsedTime::Unknown);
    }

    #[test]
    fn test_compress_args() {
        let spring = SpringProcess::new(&SpringConfig {
            binary: PathBuf::from("spring"),
            threads: 4,
            tmp_dir: Some(PathBuf::from("/scratch")),
        });
        let args = spring.compress_args(
            Path::new("/d/s_R1_001.fastq.gz"),
            Path::new("/d/s_R2_001.fastq.gz"),
            Path::new("/d/s.spring"),
        );
        assert_eq!(
            strings(&args),
            [
                "-c", "-i", "/d/s_R1_001.fastq.gz", "/d/s_R2_001.fastq.gz", "-o", "/d/s.spring",
                "-t", "4", "-g", "--working-dir", "/scratch"
            ]
        );
    }

    #[test]
    fn test_decompress_args_plain_output() {
        let spring = SpringProcess::new(&SpringConfig::default());
        let args = spring.decompress_args(
            Path::new("/d/s.spring"),
            Path::new("/d/s_R1_001.fastq.spring.fastq"),
            Path::new("/d/s_R2_001.fastq.spring.fastq"),
        );
        assert_eq!(
            strings(&args),
            [
                "-d", "-i", "/d/s.spring", "-o",
                "/d/s_R1_001.fastq.spring.fastq", "/d/s_R2_001.fastq.spring.fastq"
            ]
        );
    }
}
