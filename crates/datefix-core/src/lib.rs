pub mod bundle;
pub mod cancel;
pub mod correct;
pub mod discover;
pub mod error;
pub mod fs_ops;
pub mod organize;
pub mod report;
pub mod resolve;

use std::cell::Cell;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use bundle::{LoadFailure, MediaBundle};

pub use cancel::{CancellationToken, CancelledError};
pub use error::{ConfigError, FailureReason};
pub use fs_ops::{FsError, FsErrorKind, LocalFs, MediaFs};
pub use report::{BatchReport, FailedMedia};

/// Settings for one correction run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Folder holding the extracted Takeout export.
    pub root: PathBuf,
    /// Move corrected pairs into `<MM>/` subfolders.
    pub organize: bool,
    /// Where to write the failure report (default: system temp dir).
    pub report_path: Option<PathBuf>,
}

impl RunConfig {
    /// Create a config for `root`, which must be an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self {
            root: root.into(),
            organize: false,
            report_path: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_organize(mut self, organize: bool) -> Self {
        self.organize = organize;
        self
    }

    pub fn with_report_path(mut self, path: PathBuf) -> Self {
        self.report_path = Some(path);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.exists() {
            return Err(ConfigError::RootMissing(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ConfigError::RootNotDirectory(self.root.clone()));
        }
        Ok(())
    }

    /// The configured report location, or the default temp file.
    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(report::default_report_path)
    }
}

/// Control options for run execution.
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    /// Checked before each bundle.
    pub cancel_token: Option<CancellationToken>,
}

impl ProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .map_or(false, |t| t.check().is_err())
    }
}

/// Type alias for progress callback: `(stage, current, total, message)`.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + 'a;

/// Throttled progress reporter. Emits at most every 200ms, plus the final update.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: Cell<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        Self {
            inner,
            last_emit: Cell::new(Instant::now() - Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            if self.last_emit.get().elapsed() < Duration::from_millis(200) {
                return;
            }
            self.last_emit.set(Instant::now());
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Everything a finished (or cancelled) run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: BatchReport,
    /// Media files whose timestamps were written.
    pub corrected: u64,
    /// Of those, how many were found only under the recovered name.
    pub used_alternate: u64,
    /// Pairs moved into period folders.
    pub organized: u64,
    /// Unreadable directory entries skipped during discovery.
    pub warnings: Vec<String>,
    pub cancelled: bool,
}

/// Run discovery, loading, correction and optional organizing over `config.root`.
pub fn run(
    config: &RunConfig,
    fs: &dyn MediaFs,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<RunOutcome> {
    run_with_control(config, &ProcessControl::default(), fs, progress_callback)
}

/// Like [`run`], stopping early when the control's token is cancelled.
pub fn run_with_control(
    config: &RunConfig,
    control: &ProcessControl,
    fs: &dyn MediaFs,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<RunOutcome> {
    config.validate()?;
    let tp = ThrottledProgress::new(progress_callback);

    // Stage 1: Discover sidecars
    tp.report("discover", 0, 1, "Finding metadata files");
    let discovery = discover::discover_metadata_files(&config.root);
    let found = format!("Found {} metadata files", discovery.files.len());
    tp.report("discover", 0, 1, &found);

    // Stage 2: Parse them all
    let total = discovery.files.len() as u64;
    let loaded = bundle::load_bundles(&discovery.files);
    tp.report("load", total.saturating_sub(1), total, "Parsed metadata");

    // Stage 3: Correct (and organize) one bundle at a time
    let mut outcome = RunOutcome {
        report: BatchReport::new(0, Vec::new()),
        corrected: 0,
        used_alternate: 0,
        organized: 0,
        warnings: discovery.warnings,
        cancelled: false,
    };
    let mut failures = Vec::new();
    let mut processed = 0u64;

    for (i, item) in loaded.into_iter().enumerate() {
        if control.is_cancelled() {
            outcome.cancelled = true;
            break;
        }
        processed += 1;

        match item {
            Ok(bundle) => match process_bundle(&bundle, config.organize, fs) {
                Ok(done) => {
                    outcome.corrected += 1;
                    outcome.used_alternate += done.used_alternate as u64;
                    outcome.organized += done.organized as u64;
                }
                Err(failure) => {
                    // A relocation failure still counts as a written timestamp.
                    if failure.during_move {
                        outcome.corrected += 1;
                    }
                    failures.push(failure);
                }
            },
            Err(failure) => failures.push(load_failure(failure)),
        }
        tp.report("correct", i as u64, total, "Correcting dates");
    }

    outcome.report = BatchReport::new(processed, failures);
    Ok(outcome)
}

struct BundleDone {
    used_alternate: bool,
    organized: bool,
}

fn process_bundle(
    bundle: &MediaBundle,
    organize_enabled: bool,
    fs: &dyn MediaFs,
) -> Result<BundleDone, FailedMedia> {
    let corrected = correct::correct_bundle(bundle, fs)
        .map_err(|e| bundle_failure(bundle, e.reason, e.created, e.modified))?;

    if organize_enabled {
        let created = corrected.created;
        organize::organize(&corrected.path, &bundle.metadata_path, &created, fs).map_err(|e| {
            bundle_failure(
                bundle,
                FailureReason::Move(e),
                Some(created),
                Some(corrected.modified),
            )
        })?;
    }

    Ok(BundleDone {
        used_alternate: corrected.used_alternate,
        organized: organize_enabled,
    })
}

fn bundle_failure(
    bundle: &MediaBundle,
    reason: FailureReason,
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
) -> FailedMedia {
    FailedMedia {
        metadata_path: bundle.metadata_path.clone(),
        media_bundle: Some(bundle.clone()),
        media_path: Some(bundle.media_path.clone()),
        alternate_media_path: Some(resolve::alternate_media_path(bundle)),
        created_date: created,
        modified_date: modified,
        during_move: reason.during_move(),
        failure_reason: reason.to_string(),
    }
}

fn load_failure(failure: LoadFailure) -> FailedMedia {
    FailedMedia {
        metadata_path: failure.metadata_path,
        media_bundle: None,
        media_path: None,
        alternate_media_path: None,
        created_date: None,
        modified_date: None,
        during_move: false,
        failure_reason: FailureReason::Load(failure.error).to_string(),
    }
}
