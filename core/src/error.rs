//! Errors that abort a packaging run.
//!
//! Per-game compile problems are not errors; they are recorded as
//! [`crate::CompileOutcome::Failed`] and the run carries on.

use std::io;
use std::path::PathBuf;

pub type Result<T, E = PackError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("Failed to list directory {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create target directory {path}: {source}")]
    CreateTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove existing destination {path}: {source}")]
    RemoveExisting {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Refusing to copy {source_dir} to {dest}: the paths overlap")]
    Overlap { source_dir: PathBuf, dest: PathBuf },

    #[error("Source directory not found: {0}")]
    MissingSource(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to serialize JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PackError {
    /// Whether this error came from copying a single game directory.
    ///
    /// The pipeline consults this when the copy failure policy allows
    /// the batch to continue.
    pub fn is_copy_failure(&self) -> bool {
        matches!(
            self,
            PackError::Copy { .. }
                | PackError::RemoveExisting { .. }
                | PackError::MissingSource(_)
                | PackError::Overlap { .. }
        )
    }
}
