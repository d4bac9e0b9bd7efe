use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// One `{ "timestamp": "...", "formatted": "..." }` block of a Takeout sidecar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInfo {
    /// Seconds since the Unix epoch, kept as text until correction time.
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: Option<String>,
    /// Human-readable rendering. Informational only.
    #[serde(default)]
    pub formatted: Option<String>,
}

/// Parsed contents of a sidecar metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub title: String,
    #[serde(default)]
    pub creation_time: Option<TimeInfo>,
    #[serde(default)]
    pub photo_taken_time: Option<TimeInfo>,
    #[serde(default, alias = "lastModifiedTime")]
    pub photo_last_modified_time: Option<TimeInfo>,
}

impl MediaRecord {
    /// Capture time if known, otherwise the upload time.
    pub fn created_timestamp(&self) -> Option<&str> {
        timestamp_of(&self.photo_taken_time).or_else(|| timestamp_of(&self.creation_time))
    }

    pub fn modified_timestamp(&self) -> Option<&str> {
        timestamp_of(&self.photo_last_modified_time)
    }
}

fn timestamp_of(time: &Option<TimeInfo>) -> Option<&str> {
    time.as_ref()?.timestamp.as_deref()
}

/// Takeout writes timestamps as strings, some exports as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "timestamp must be a string or a number, got {}",
            other
        ))),
    }
}

/// A sidecar file together with the media file it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaBundle {
    #[serde(rename = "media")]
    pub record: MediaRecord,
    /// `<sidecar dir>/<title>`
    #[serde(rename = "mediaFileURL")]
    pub media_path: PathBuf,
    #[serde(rename = "jsonURL")]
    pub metadata_path: PathBuf,
}

impl MediaBundle {
    pub fn new(record: MediaRecord, metadata_path: PathBuf) -> Result<Self, LoadError> {
        if !is_plain_file_name(&record.title) {
            return Err(LoadError::UnsafeTitle(record.title));
        }
        let media_path = metadata_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&record.title);
        Ok(Self {
            record,
            media_path,
            metadata_path,
        })
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read metadata: {0}")]
    Read(#[from] io::Error),
    #[error("malformed metadata: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("title {0:?} is not a plain file name")]
    UnsafeTitle(String),
}

/// A sidecar that could not be turned into a bundle.
#[derive(Debug)]
pub struct LoadFailure {
    pub metadata_path: PathBuf,
    pub error: LoadError,
}

/// Parse one sidecar and derive its expected media path.
pub fn load_bundle(metadata_path: &Path) -> Result<MediaBundle, LoadError> {
    let reader = BufReader::new(File::open(metadata_path)?);
    let record: MediaRecord = serde_json::from_reader(reader)?;
    MediaBundle::new(record, metadata_path.to_path_buf())
}

/// Load every sidecar, keeping failures in place instead of aborting.
pub fn load_bundles(paths: &[PathBuf]) -> Vec<Result<MediaBundle, LoadFailure>> {
    paths
        .iter()
        .map(|path| {
            load_bundle(path).map_err(|error| LoadFailure {
                metadata_path: path.clone(),
                error,
            })
        })
        .collect()
}

fn is_plain_file_name(title: &str) -> bool {
    if title.is_empty() || title.contains('/') || title.contains('\\') {
        return false;
    }
    let mut components = Path::new(title).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
