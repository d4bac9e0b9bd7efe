use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::resolve::duplicate_suffix;

/// Album-level metadata written by Takeout; it describes no single media file.
pub const RESERVED_METADATA_NAME: &str = "metadata.json";

pub const METADATA_EXTENSION: &str = "json";

/// Directory extensions treated as opaque bundles and never descended into.
const PACKAGE_EXTENSIONS: &[&str] = &[
    "app",
    "bundle",
    "framework",
    "photoslibrary",
    "pkg",
    "plugin",
    "kext",
    "xcodeproj",
];

#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    /// Entries that could not be read. The walk continued past each one.
    pub warnings: Vec<String>,
}

/// Recursively collect sidecar metadata files under `root`.
///
/// Symlinks are followed; loops and dangling links become warnings. Within a
/// folder, `a.jpg.json` always comes before its duplicates `a.jpg(1).json`,
/// so the original claims the un-suffixed media file first.
pub fn discover_metadata_files(root: &Path) -> Discovery {
    let mut discovery = Discovery::default();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || is_package_dir(e)));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let at = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                discovery.warnings.push(format!("{}: {}", at, e));
                continue;
            }
        };
        if entry.file_type().is_file() && is_metadata_file(entry.path()) {
            discovery.files.push(entry.into_path());
        }
    }

    discovery.files.sort_by_cached_key(|path| processing_key(path));
    discovery
}

/// `(folder, name without duplicate suffix, suffix)`
fn processing_key(path: &Path) -> (PathBuf, String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = duplicate_suffix(&stem).to_string();
    let base = stem[..stem.len() - suffix.len()].to_string();
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    (dir, base, suffix)
}

fn is_metadata_file(path: &Path) -> bool {
    let has_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(METADATA_EXTENSION));
    has_ext && path.file_name().and_then(|n| n.to_str()) != Some(RESERVED_METADATA_NAME)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map_or(false, |name| name.starts_with('.'))
}

fn is_package_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| {
                PACKAGE_EXTENSIONS
                    .iter()
                    .any(|p| p.eq_ignore_ascii_case(ext))
            })
}
