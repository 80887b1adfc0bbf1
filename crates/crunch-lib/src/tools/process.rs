use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, error, info};

use crate::error::{CrunchError, Result};

/// One call of an external binary. Arguments are passed as a vector, never
/// through a shell.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub binary: PathBuf,
    pub args: Vec<OsString>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a finished child process.
#[derive(Clone, Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl ToolOutput {
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }

    pub fn stderr_lines(&self) -> impl Iterator<Item = &str> {
        self.stderr.lines()
    }
}

/// Runs a fixed binary with per-call arguments.
///
/// Holds no per-call state: every [`Process::run`] returns its own
/// [`ToolOutput`], so one instance can be shared freely.
#[derive(Clone, Debug)]
pub struct Process {
    binary: PathBuf,
}

impl Process {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let binary = binary.into();
        debug!("Initialising process with binary {}", binary.display());
        Self { binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Invocation {
            binary: self.binary.clone(),
            args: args.into_iter().map(|a| a.as_ref().to_os_string()).collect(),
        }
    }

    /// Run to completion. A non-zero exit status is an error carrying the
    /// captured stderr.
    pub fn run<I, S>(&self, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let invocation = self.invocation(args);
        let command = invocation.to_string();
        info!("Running command {}", command);

        let output = Command::new(&invocation.binary)
            .args(&invocation.args)
            .output()
            .map_err(|e| CrunchError::ToolInvocation {
                command: command.clone(),
                code: None,
                stderr: e.to_string(),
            })?;

        let result = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            status: output.status,
        };

        if !result.status.success() {
            error!("Call {} exited with a non zero exit code", command);
            for line in result.stderr_lines() {
                error!("{}", line);
            }
            return Err(CrunchError::ToolInvocation {
                command,
                code: result.status.code(),
                stderr: result.stderr,
            });
        }

        Ok(result)
    }
}
