use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrunchError>;

/// Required tool configuration is absent or unusable.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("No reference genome configured, provide one with --reference")]
    ReferenceNotConfigured,
    #[error("Reference genome {0} does not exist")]
    ReferenceMissing(PathBuf),
}

/// A filesystem precondition failed before any tool was invoked.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("Output path {0} already exists")]
    OutputExists(PathBuf),
    #[error("Could not find file {0}")]
    InputMissing(PathBuf),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("Both mates would be decompressed to {0} during verification")]
    TempPathCollision(PathBuf),
}

#[derive(Debug, Error)]
pub enum CrunchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The child process could not be started or exited non-zero.
    #[error("Command `{command}` failed ({}): {stderr}", describe_code(.code))]
    ToolInvocation {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The child process exited zero but never reported completion.
    #[error("Command `{command}` exited without reporting '{marker}': {stderr}")]
    MissingMarker {
        command: String,
        marker: &'static str,
        stderr: String,
    },

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    Verification {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

impl CrunchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure: 2 for a missing input path, 1 for
    /// every other abort.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Precondition(PreconditionError::InputMissing(_)) => 2,
            _ => 1,
        }
    }

    /// True for failures reported by an external tool rather than by the
    /// round-trip verification.
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Self::ToolInvocation { .. } | Self::MissingMarker { .. })
    }
}
