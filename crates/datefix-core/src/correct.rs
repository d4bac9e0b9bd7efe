use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::bundle::MediaBundle;
use crate::error::FailureReason;
use crate::fs_ops::{FsErrorKind, MediaFs};
use crate::resolve::alternate_media_path;

/// A bundle whose media file now carries the sidecar's times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corrected {
    /// The file that was actually updated.
    pub path: PathBuf,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub used_alternate: bool,
}

#[derive(Debug)]
pub struct CorrectionError {
    pub reason: FailureReason,
    /// Instants that were derived before the failure, if any.
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl CorrectionError {
    fn new(reason: FailureReason) -> Self {
        Self {
            reason,
            created: None,
            modified: None,
        }
    }

    fn with_dates(reason: FailureReason, created: DateTime<Utc>, modified: DateTime<Utc>) -> Self {
        Self {
            reason,
            created: Some(created),
            modified: Some(modified),
        }
    }
}

/// Parse decimal seconds since the Unix epoch (`"1609459200"`, `"1609459200.5"`).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(secs) = text.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    let secs: f64 = text.parse().ok()?;
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Write the sidecar's created/modified times onto the bundle's media file.
///
/// The expected path is tried first. Only a "not found" failure falls back to
/// the recovered alternate name; every other error is reported as is.
pub fn correct_bundle(
    bundle: &MediaBundle,
    fs: &dyn MediaFs,
) -> Result<Corrected, CorrectionError> {
    let created_text = bundle
        .record
        .created_timestamp()
        .ok_or_else(|| CorrectionError::new(FailureReason::CreatedTimestampMissing))?;
    let modified_text = bundle
        .record
        .modified_timestamp()
        .ok_or_else(|| CorrectionError::new(FailureReason::ModifiedTimestampMissing))?;

    let created = parse_timestamp(created_text).ok_or_else(|| {
        CorrectionError::new(FailureReason::InvalidTimestamp {
            field: "created",
            value: created_text.to_string(),
        })
    })?;
    let modified = parse_timestamp(modified_text).ok_or_else(|| CorrectionError {
        reason: FailureReason::InvalidTimestamp {
            field: "modified",
            value: modified_text.to_string(),
        },
        created: Some(created),
        modified: None,
    })?;

    let err = match fs.set_times(&bundle.media_path, created, modified) {
        Ok(()) => {
            return Ok(Corrected {
                path: bundle.media_path.clone(),
                created,
                modified,
                used_alternate: false,
            })
        }
        Err(err) => err,
    };

    match err.kind {
        FsErrorKind::NotFound => {
            let alternate = alternate_media_path(bundle);
            if alternate == bundle.media_path {
                let reason = FailureReason::Write(err);
                return Err(CorrectionError::with_dates(reason, created, modified));
            }
            fs.set_times(&alternate, created, modified).map_err(|retry_err| {
                CorrectionError::with_dates(FailureReason::Write(retry_err), created, modified)
            })?;
            Ok(Corrected {
                path: alternate,
                created,
                modified,
                used_alternate: true,
            })
        }
        FsErrorKind::PermissionDenied | FsErrorKind::Other => {
            Err(CorrectionError::with_dates(FailureReason::Write(err), created, modified))
        }
    }
}
