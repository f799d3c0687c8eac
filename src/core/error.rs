use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Every failure that aborts an audit run.
///
/// Messages describe only their own layer; print with `{:#}` (via `anyhow`)
/// to get the full cause chain.
///
/// Policy violations (an invalid pointer, an untracked large file) are not
/// errors; they are reported and folded into the run's verdict instead.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("invalid size-limit '{input}': {reason}")]
    InvalidSizeLimit { input: String, reason: String },

    #[error("failed to read {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to open repository at {}", path.display())]
    OpenRepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' failed ({status})")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("error while processing '{path}'")]
    Path {
        path: String,
        #[source]
        source: Box<AuditError>,
    },

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AuditError {
    /// Attaches the path being processed to an error.
    pub fn at_path(self, path: &str) -> Self {
        AuditError::Path {
            path: path.to_string(),
            source: Box::new(self),
        }
    }

    /// True for configuration problems, which are detected before the
    /// repository is ever touched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AuditError::InvalidSizeLimit { .. }
                | AuditError::ConfigRead { .. }
                | AuditError::ConfigParse { .. }
        )
    }
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;
