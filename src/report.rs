//! Run event reporting.
//!
//! The pipeline never prints. It emits events through the [`Reporter`]
//! trait, and [`ConsoleReporter`] renders them as one line each on stdout.
//!
//! Reporters are called from worker threads, so implementations must be
//! `Send + Sync` and should keep each call short.

use std::io::{self, Write};
use std::path::Path;

use yansi::Paint;

use crate::dispatch::{RootSummary, RunSummary};

/// Receiver for pipeline events.
pub trait Reporter: Send + Sync {
    /// A root has been scanned and `eligible` files are about to be dispatched.
    fn on_root_start(&self, _root: &Path, _eligible: usize) {}

    /// A subtitle was downloaded and written next to `media`.
    fn on_downloaded(&self, media: &Path, subtitle: &Path);

    /// The index had no subtitle for `media`.
    fn on_not_found(&self, media: &Path, status: u16);

    /// Processing `path` failed; it stays eligible for the next run.
    fn on_error(&self, path: &Path, message: &str);

    /// A root finished (normally, cancelled, or unscannable).
    fn on_root_complete(&self, _summary: &RootSummary) {}

    /// The whole run finished and the cache was saved.
    fn on_summary(&self, summary: &RunSummary);
}

/// Line-per-event console output.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    /// Create a console reporter. When `quiet`, only errors and the final
    /// summary are printed.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn print(&self, line: String) {
        // stdout is shared with every worker; one write_all per event
        let mut out = io::stdout().lock();
        let _ = out.write_all(line.as_bytes());
        let _ = out.write_all(b"\n");
    }
}

impl Reporter for ConsoleReporter {
    fn on_root_start(&self, root: &Path, eligible: usize) {
        if !self.quiet {
            self.print(format!(
                "{} {} ({} files without subtitles)",
                "Scanning".bold(),
                root.display(),
                eligible
            ));
        }
    }

    fn on_downloaded(&self, _media: &Path, subtitle: &Path) {
        if !self.quiet {
            self.print(format!("{} {}", "Downloaded".green(), subtitle.display()));
        }
    }

    fn on_not_found(&self, media: &Path, status: u16) {
        if !self.quiet {
            self.print(format!(
                "{} {} (HTTP {})",
                "Not found".yellow(),
                media.display(),
                status
            ));
        }
    }

    fn on_error(&self, path: &Path, message: &str) {
        let line = format!("{} {}: {}", "Error".red().bold(), path.display(), message);
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{}", line);
    }

    fn on_summary(&self, summary: &RunSummary) {
        let mut lines = Vec::new();
        if summary.interrupted {
            lines.push(format!("{}", "Interrupted before all files were processed".yellow()));
        }
        for root in &summary.roots {
            if root.scan_failed {
                lines.push(format!("  {}: {}", root.root.display(), "not scanned".red()));
            } else {
                lines.push(format!(
                    "  {}: {} downloaded, {} not found, {} failed, {} skipped",
                    root.root.display(),
                    root.stats.downloaded,
                    root.stats.not_found,
                    root.stats.failed,
                    root.stats.skipped
                ));
            }
        }
        lines.push(format!(
            "{} {} subtitles downloaded, {} files cached without a match",
            "Done:".bold(),
            summary.downloads,
            summary.cached_entries
        ));
        self.print(lines.join("\n"));
    }
}
