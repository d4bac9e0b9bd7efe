use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The filesystem failure classes the pipeline switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorKind {
    NotFound,
    PermissionDenied,
    Other,
}

impl From<io::ErrorKind> for FsErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => FsErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => FsErrorKind::PermissionDenied,
            _ => FsErrorKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {}", .path.display(), .message)]
pub struct FsError {
    pub kind: FsErrorKind,
    pub path: PathBuf,
    pub message: String,
}

impl FsError {
    pub fn new(kind: FsErrorKind, path: &Path, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        Self::new(err.kind().into(), path, err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FsErrorKind::NotFound
    }
}

/// Filesystem mutations used by the corrector and the organizer.
pub trait MediaFs {
    /// Apply creation and modification times to an existing file.
    fn set_times(
        &self,
        path: &Path,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    ) -> Result<(), FsError>;

    /// Create `dir` and any missing parents. An existing directory is reused.
    fn create_dir_all(&self, dir: &Path) -> Result<(), FsError>;

    /// Move a file. Never overwrites an existing destination.
    fn move_file(&self, from: &Path, to: &Path) -> Result<(), FsError>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl MediaFs for LocalFs {
    fn set_times(
        &self,
        path: &Path,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    ) -> Result<(), FsError> {
        write_times(path, created, modified).map_err(|e| FsError::from_io(path, &e))
    }

    fn create_dir_all(&self, dir: &Path) -> Result<(), FsError> {
        fs::create_dir_all(dir).map_err(|e| FsError::from_io(dir, &e))
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if to.exists() {
            return Err(FsError::new(FsErrorKind::Other, to, "destination already exists"));
        }
        fs::rename(from, to).map_err(|e| FsError::from_io(from, &e))
    }
}

/// Birth time is writable on Windows and macOS; both times go out in one call
/// so a failure leaves the file untouched.
#[cfg(any(windows, target_os = "macos"))]
fn write_times(path: &Path, created: DateTime<Utc>, modified: DateTime<Utc>) -> io::Result<()> {
    #[cfg(target_os = "macos")]
    use std::os::macos::fs::FileTimesExt;
    #[cfg(windows)]
    use std::os::windows::fs::FileTimesExt;

    let file = fs::OpenOptions::new().write(true).open(path)?;
    let times = fs::FileTimes::new()
        .set_modified(modified.into())
        .set_created(created.into());
    file.set_times(times)
}

#[cfg(not(any(windows, target_os = "macos")))]
fn write_times(path: &Path, _created: DateTime<Utc>, modified: DateTime<Utc>) -> io::Result<()> {
    let mtime =
        filetime::FileTime::from_unix_time(modified.timestamp(), modified.timestamp_subsec_nanos());
    filetime::set_file_mtime(path, mtime)
}
