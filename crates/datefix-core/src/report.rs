use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bundle::MediaBundle;

/// Default report file name, placed in the system temp directory.
pub const REPORT_FILENAME: &str = "failedMediaReport.json";

/// One item that could not be fully processed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedMedia {
    #[serde(rename = "metadataURL")]
    pub metadata_path: PathBuf,
    /// Absent when the sidecar itself could not be parsed.
    pub media_bundle: Option<MediaBundle>,
    #[serde(rename = "mediaURL")]
    pub media_path: Option<PathBuf>,
    #[serde(rename = "alternateMediaURL")]
    pub alternate_media_path: Option<PathBuf>,
    pub created_date: Option<DateTime<Utc>>,
    pub modified_date: Option<DateTime<Utc>>,
    pub failure_reason: String,
    /// The timestamps were written; only the relocation failed.
    pub during_move: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub processed: u64,
    pub failed_items: u64,
    pub successful_items: u64,
    pub media: Vec<FailedMedia>,
}

impl BatchReport {
    /// Counts are derived from `media`, so they always add up to `processed`.
    pub fn new(processed: u64, media: Vec<FailedMedia>) -> Self {
        let failed_items = media.len() as u64;
        Self {
            processed,
            failed_items,
            successful_items: processed.saturating_sub(failed_items),
            media,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.media.is_empty()
    }

    /// Pretty JSON with keys sorted at every level.
    pub fn to_json(&self) -> anyhow::Result<String> {
        // serde_json::Map is ordered by key unless `preserve_order` is enabled.
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(self.to_json()?.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// `<temp dir>/failedMediaReport.json`
pub fn default_report_path() -> PathBuf {
    std::env::temp_dir().join(REPORT_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn failure(reason: &str, during_move: bool) -> FailedMedia {
        FailedMedia {
            metadata_path: PathBuf::from("/t/a.jpg.json"),
            media_bundle: None,
            media_path: Some(PathBuf::from("/t/a.jpg")),
            alternate_media_path: Some(PathBuf::from("/t/a.jpg")),
            created_date: DateTime::from_timestamp(1000, 0),
            modified_date: None,
            failure_reason: reason.to_string(),
            during_move,
        }
    }

    #[test]
    fn test_counts_add_up() {
        let report = BatchReport::new(5, vec![failure("x", false), failure("y", true)]);
        assert_eq!(report.failed_items, 2);
        assert_eq!(report.successful_items, 3);
        assert_eq!(report.processed, report.failed_items + report.successful_items);

        let empty = BatchReport::new(4, vec![]);
        assert!(!empty.has_failures());
        assert_eq!(empty.successful_items, 4);
    }

    #[test]
    fn test_json_keys_sorted_and_named() {
        let report = BatchReport::new(1, vec![failure("created timestamp missing", false)]);
        let json = report.to_json().unwrap();

        let keys = ["\"failedItems\"", "\"media\"", "\"processed\"", "\"successfulItems\""];
        let top: Vec<usize> = keys
            .iter()
            .map(|k| json.find(k).unwrap())
            .collect();
        assert!(top.windows(2).all(|w| w[0] < w[1]));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &value["media"][0];
        assert_eq!(entry["mediaURL"], "/t/a.jpg");
        assert_eq!(entry["createdDate"], "1970-01-01T00:16:40Z");
        assert!(entry["modifiedDate"].is_null());
        assert_eq!(entry["duringMove"], false);
        assert_eq!(entry["failureReason"], "created timestamp missing");
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(REPORT_FILENAME);
        BatchReport::new(1, vec![failure("x", false)]).save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["failedItems"], 1);
        assert_eq!(value["processed"], 1);
    }
}
