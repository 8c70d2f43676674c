//! subseek - Fetch missing subtitles by content fingerprint
//!
//! Scans media libraries for video files without a sibling `.srt`,
//! fingerprints each one from its first and last 64 KiB, and asks a remote
//! subtitle index for a match. Files the index has nothing for are cached,
//! so later runs do not ask again.
//!
//! # Pipeline
//!
//! ```text
//! root ─▶ scanner::Walker ─▶ dispatch::Dispatcher ─┬▶ scanner::Hasher
//!                                                   ├▶ lookup::SubtitleLookup
//!                                                   └▶ cache / download_log / report
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod download_log;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod report;
pub mod scanner;
pub mod signal;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::CacheStore;
use crate::cli::Cli;
use crate::config::Config;
use crate::dispatch::{Dispatcher, RunContext, RunSummary};
use crate::download_log::DownloadLog;
use crate::error::ExitCode;
use crate::lookup::{SubDbClient, SubtitleLookup};
use crate::report::{ConsoleReporter, Reporter};

/// Run the application: configure, process both roots, save, summarize.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the signal handler or HTTP
/// client cannot be set up, the download log cannot be opened, or the cache
/// cannot be saved.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let handler = signal::install_handler()?;

    let lookup = SubDbClient::new(config.endpoint.clone(), config.request_timeout())?;
    let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new(cli.quiet));

    let summary = process_roots(&config, Arc::new(lookup), reporter, handler.get_flag())?;
    Ok(exit_code(&summary))
}

/// Process every configured root in order with the given lookup and reporter.
///
/// The cache is loaded once before the first root and saved exactly once
/// after the last root finished or shutdown stopped the run. Shutdown never
/// interrupts a started file; it only prevents new files and later roots
/// from starting.
///
/// # Errors
///
/// Returns an error if the download log cannot be opened or the cache
/// cannot be saved. The summary is still reported in the latter case.
pub fn process_roots(
    config: &Config,
    lookup: Arc<dyn SubtitleLookup>,
    reporter: Arc<dyn Reporter>,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<RunSummary> {
    let cache = Arc::new(CacheStore::load(&config.cache_file));
    log::info!("{} files cached without a match", cache.count());

    let download_log = DownloadLog::open(&config.log_file).with_context(|| {
        format!(
            "Failed to open download log: {}",
            config.log_file.display()
        )
    })?;

    let context = Arc::new(
        RunContext::new(Arc::clone(&cache), download_log, config.languages.clone())
            .with_shutdown_flag(shutdown_flag),
    );

    let mut dispatcher = Dispatcher::new(Arc::clone(&context), lookup, Arc::clone(&reporter))
        .with_hasher(config.hasher())
        .with_walker_config(config.walker_config());
    if let Some(workers) = config.workers {
        dispatcher = dispatcher.with_workers(workers);
    }
    log::debug!("Dispatching with {} workers", dispatcher.workers());

    let mut roots = Vec::new();
    for root in config.roots() {
        if context.is_shutdown_requested() {
            log::info!("Shutdown requested, not scanning {}", root.display());
            break;
        }
        roots.push(dispatcher.run_root(root));
    }

    let saved = cache.save(&config.cache_file);

    let summary = RunSummary {
        roots,
        downloads: context.downloads(),
        cached_entries: cache.count(),
        interrupted: context.is_shutdown_requested(),
    };
    reporter.on_summary(&summary);

    saved.with_context(|| format!("Failed to save cache: {}", config.cache_file.display()))?;
    Ok(summary)
}

/// Map a finished run to its exit code.
#[must_use]
pub fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.interrupted {
        ExitCode::Interrupted
    } else if summary.has_failures() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}
