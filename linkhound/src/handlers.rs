use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use linkhound_core::report::{self, ReportFormat, ScanReport};
use linkhound_core::scan::validate_root_url;
use linkhound_core::{ScanOptions, ScanProgress, Scanner};
use linkhound_scanner::ChromiumLauncher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Helper functions for the scan handler

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

pub fn parse_format(raw: &str) -> Result<ReportFormat> {
    ReportFormat::from_str(raw).ok_or_else(|| anyhow!("Unsupported report format '{}'", raw))
}

/// One-line spinner message for a pipeline milestone
pub fn describe_progress(progress: &ScanProgress) -> String {
    match progress {
        ScanProgress::Crawling { page, url } => format!("Crawling page {}: {}", page, url),
        ScanProgress::Crawled {
            pages,
            references,
            unique_targets,
        } => format!(
            "Crawled {} pages, {} references to {} unique URLs",
            pages, references, unique_targets
        ),
        ScanProgress::Verifying { index, total, url } => {
            format!("Verifying [{}/{}] {}", index, total, url)
        }
        ScanProgress::Capturing { index, total, url } => {
            format!("Capturing evidence [{}/{}] {}", index, total, url)
        }
        ScanProgress::Finished { issues } => format!("Done, {} issues found", issues),
    }
}

/// Logs go to stderr so reports on stdout stay clean.
pub fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_divider() {
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
}

/// Banner goes to stderr with the rest of the chrome; stdout carries only the report.
pub fn print_banner() {
    print_divider();
    eprintln!("{}", "  LINKHOUND  broken link scanner".bright_white().bold());
    print_divider();
    eprintln!();
}

fn progress_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn print_scan_summary(report: &ScanReport) {
    let health = match report.health_score {
        Some(score) if score >= 90 => format!("{}/100", score).green().bold(),
        Some(score) if score >= 70 => format!("{}/100", score).yellow().bold(),
        Some(score) => format!("{}/100", score).red().bold(),
        None => "n/a".bright_black().bold(),
    };
    let counts = &report.summary.priority_counts;

    eprintln!();
    eprintln!("{} Scan complete: {}", "✓".green().bold(), report.root_url.bright_white());
    eprintln!("  Health score: {}", health);
    eprintln!(
        "  Pages: {}  References: {}  Unique URLs: {}",
        report.summary.pages_visited.to_string().cyan(),
        report.summary.total_references.to_string().cyan(),
        report.summary.unique_targets.to_string().cyan()
    );
    eprintln!(
        "  Issues: {} critical, {} high, {} medium, {} low",
        counts.critical.to_string().red().bold(),
        counts.high.to_string().yellow(),
        counts.medium.to_string().blue(),
        counts.low.to_string().bright_black()
    );
    eprintln!();
}

/// Render `report` and either print it or save it to `output`.
pub fn emit_report(report: &ScanReport, format: ReportFormat, output: Option<&Path>) -> Result<()> {
    let rendered = report::render(report, format).context("Failed to render report")?;
    match output {
        Some(path) => {
            report::save_report(&rendered, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

pub fn emit_screenshots(report: &ScanReport, dir: &Path) -> Result<Vec<PathBuf>> {
    let written = report::export_screenshots(report, dir)
        .with_context(|| format!("Failed to export screenshots to {}", dir.display()))?;
    eprintln!(
        "{} {} screenshot(s) written to {}",
        "✓".green().bold(),
        written.len(),
        dir.display().to_string().bright_white()
    );
    Ok(written)
}

pub async fn handle_scan(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let raw_url = sub_matches
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    // Reject bad input before a browser is ever launched
    let root = validate_root_url(raw_url)?;

    let max_pages = *sub_matches.get_one::<usize>("max-pages").unwrap_or(&20);
    let capture_evidence = !sub_matches.get_flag("no-screenshots");
    let format = parse_format(
        sub_matches
            .get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("text"),
    )?;
    let output = sub_matches.get_one::<String>("output").map(|p| expand_path(p));
    let screenshot_dir = sub_matches
        .get_one::<String>("screenshot-dir")
        .map(|p| expand_path(p));

    let mut launcher = ChromiumLauncher::new().with_headless(!sub_matches.get_flag("show-browser"));
    if let Some(path) = sub_matches.get_one::<String>("chromium") {
        launcher = launcher.with_executable(expand_path(path));
    }

    if !quiet {
        eprintln!("{} Scanning {}", "→".blue(), root.as_str().bright_white());
        eprintln!("  Max pages: {}", max_pages);
        eprintln!(
            "  Screenshots: {}\n",
            if capture_evidence { "enabled" } else { "disabled" }
        );
    }

    let mut scanner = Scanner::new(Arc::new(launcher))?;
    let spinner = (!quiet).then(progress_spinner);
    if let Some(ref spinner) = spinner {
        let spinner = spinner.clone();
        scanner = scanner.with_progress_callback(Arc::new(move |progress: ScanProgress| {
            spinner.set_message(describe_progress(&progress));
        }));
    }

    let options = ScanOptions::new(root.as_str())
        .with_max_pages(max_pages)
        .with_capture_evidence(capture_evidence);
    let result = scanner.scan(&options).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = result.with_context(|| format!("Scan of {} failed", root))?;
    info!("Scan {} finished with {} issues", report.scan_id, report.issues.len());

    if !quiet {
        print_scan_summary(&report);
    }
    emit_report(&report, format, output.as_deref())?;
    if let Some(dir) = screenshot_dir {
        emit_screenshots(&report, &dir)?;
    }
    Ok(())
}
