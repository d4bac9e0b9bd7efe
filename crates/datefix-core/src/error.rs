use std::path::PathBuf;

use thiserror::Error;

use crate::bundle::LoadError;
use crate::fs_ops::FsError;

/// Why a single item ended up in the failure report.
#[derive(Debug, Error)]
pub enum FailureReason {
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("created timestamp missing")]
    CreatedTimestampMissing,
    #[error("modified timestamp missing")]
    ModifiedTimestampMissing,
    #[error("invalid {field} timestamp: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("{0}")]
    Write(FsError),
    #[error("move failed: {0}")]
    Move(FsError),
}

impl FailureReason {
    /// Failures that happen after timestamps were already written.
    pub fn during_move(&self) -> bool {
        matches!(self, FailureReason::Move(_))
    }
}

/// Problems with the run configuration. Raised before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("root folder does not exist: {}", .0.display())]
    RootMissing(PathBuf),
    #[error("root is not a folder: {}", .0.display())]
    RootNotDirectory(PathBuf),
}
