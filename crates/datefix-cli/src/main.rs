use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};

use datefix_core::{CancellationToken, LocalFs, ProcessControl, RunConfig};

#[derive(Parser)]
#[command(
    name = "takeout-datefix",
    version,
    about = "Google Photos Takeout date corrector - restore file timestamps from JSON sidecars"
)]
struct Cli {
    /// Extracted Takeout folder to process
    #[arg(value_parser = existing_dir)]
    root: PathBuf,

    /// Move corrected files and their sidecars into <MM> month subfolders
    #[arg(long, value_name = "true|false", action = ArgAction::Set, default_value_t = false)]
    organize: bool,

    /// Output path for the failure report (default: <temp dir>/failedMediaReport.json)
    #[arg(long)]
    report: Option<PathBuf>,
}

fn existing_dir(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if !path.exists() {
        return Err(format!("folder does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("not a folder: {}", s));
    }
    Ok(path)
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("[{msg}] {bar:40} {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    let mut config = RunConfig::new(cli.root)?.with_organize(cli.organize);
    if let Some(report) = cli.report {
        config = config.with_report_path(report);
    }

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling after the current file...");
        handler_token.cancel();
    })?;
    let control = ProcessControl::new().with_cancel_token(token);

    eprintln!("Correcting media dates in {}", config.root.display());
    let bar = progress_bar();
    let on_progress = |stage: &str, current: u64, total: u64, message: &str| {
        bar.set_length(total);
        bar.set_position(current + 1);
        bar.set_message(format!("{}: {}", stage, message));
    };
    let outcome = datefix_core::run_with_control(&config, &control, &LocalFs, &on_progress)?;
    bar.finish_and_clear();

    for warning in &outcome.warnings {
        eprintln!("Skipped unreadable entry: {}", warning);
    }

    let report = &outcome.report;
    eprintln!("Processed items  : {}", report.processed);
    eprintln!("Successful items : {}", report.successful_items);
    if outcome.used_alternate > 0 {
        eprintln!("  via recovered name: {}", outcome.used_alternate);
    }
    if config.organize {
        eprintln!("Organized items  : {}", outcome.organized);
    }
    if report.has_failures() {
        let report_path = config.report_path();
        report.save(&report_path)?;
        eprintln!("Failed items     : {}", report.failed_items);
        eprintln!("Report saved to  : {}", report_path.display());
    } else {
        eprintln!("No failures");
    }
    eprintln!("Took {:.2}s", t_total.elapsed().as_secs_f64());

    if outcome.cancelled {
        eprintln!("Cancelled before all files were processed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
