use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::fs_ops::{FsError, FsErrorKind, MediaFs};

/// Two-digit month of `created`, in UTC.
pub fn period_label(created: &DateTime<Utc>) -> String {
    created.format("%m").to_string()
}

fn period_destination(file: &Path, label: &str) -> Result<(PathBuf, PathBuf), FsError> {
    let name = file
        .file_name()
        .ok_or_else(|| FsError::new(FsErrorKind::Other, file, "path has no file name"))?;
    let dir = file
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(label);
    let dest = dir.join(name);
    Ok((dir, dest))
}

fn move_into_period(file: &Path, label: &str, fs: &dyn MediaFs) -> Result<(), FsError> {
    let (dir, dest) = period_destination(file, label)?;
    fs.create_dir_all(&dir)?;
    fs.move_file(file, &dest)
}

/// Move a media file and its sidecar into a `<MM>/` folder next to each of them.
///
/// The media file moves first. If the sidecar move then fails the media file
/// stays in its new place; there is no rollback.
pub fn organize(
    media_path: &Path,
    metadata_path: &Path,
    created: &DateTime<Utc>,
    fs: &dyn MediaFs,
) -> Result<(), FsError> {
    let label = period_label(created);
    move_into_period(media_path, &label, fs)?;
    move_into_period(metadata_path, &label, fs)
}
