//! Bounded worker pool driving hash → lookup → record for each file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use super::{CompleteOnDrop, DispatchStats, RootSummary, RunCompletion, RunContext};
use crate::lookup::{Lookup, SubtitleLookup};
use crate::report::Reporter;
use crate::scanner::{Hasher, MediaFile, Walker, WalkerConfig};

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Downloaded,
    NotFound,
    Failed,
    Skipped,
}

/// Runs eligible files through the hasher and lookup on a bounded pool.
pub struct Dispatcher {
    context: Arc<RunContext>,
    lookup: Arc<dyn SubtitleLookup>,
    reporter: Arc<dyn Reporter>,
    hasher: Hasher,
    walker_config: WalkerConfig,
    workers: usize,
    completion: Arc<RunCompletion>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("context", &self.context)
            .field("hasher", &self.hasher)
            .field("walker_config", &self.walker_config)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher with one worker per available CPU.
    #[must_use]
    pub fn new(
        context: Arc<RunContext>,
        lookup: Arc<dyn SubtitleLookup>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            context,
            lookup,
            reporter,
            hasher: Hasher::new(),
            walker_config: WalkerConfig::default(),
            workers: default_workers(),
            completion: Arc::new(RunCompletion::new()),
        }
    }

    /// Set the number of concurrent workers (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Use a custom hasher (retry policy).
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Set the listing options used by [`Dispatcher::run_root`].
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Number of concurrent workers.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Shared run context.
    #[must_use]
    pub fn context(&self) -> &Arc<RunContext> {
        &self.context
    }

    /// Latch set at the end of every `run`/`run_root` call.
    #[must_use]
    pub fn completion(&self) -> Arc<RunCompletion> {
        Arc::clone(&self.completion)
    }

    /// Scan `root` and dispatch its eligible files.
    ///
    /// A root that cannot be listed is reported as an error and yields a
    /// summary with `scan_failed` set; it never aborts the caller.
    pub fn run_root(&self, root: &Path) -> RootSummary {
        self.completion.reset();
        let _complete = CompleteOnDrop(&self.completion);

        let walker = Walker::new(root, self.walker_config.clone())
            .with_shutdown_flag(self.context.shutdown_flag());

        let summary = match walker.scan(self.context.cache()) {
            Ok(files) => {
                log::info!("{}: {} eligible files", root.display(), files.len());
                self.reporter.on_root_start(root, files.len());
                RootSummary {
                    root: root.to_path_buf(),
                    stats: self.dispatch(files),
                    scan_failed: false,
                }
            }
            Err(e) => {
                log::error!("Skipping root {}: {}", root.display(), e);
                self.reporter.on_error(root, &e.to_string());
                RootSummary {
                    root: root.to_path_buf(),
                    scan_failed: true,
                    ..Default::default()
                }
            }
        };

        self.reporter.on_root_complete(&summary);
        summary
    }

    /// Dispatch already-filtered files and wait for all started work.
    pub fn run(&self, files: Vec<MediaFile>) -> DispatchStats {
        self.completion.reset();
        let _complete = CompleteOnDrop(&self.completion);
        self.dispatch(files)
    }

    fn dispatch(&self, files: Vec<MediaFile>) -> DispatchStats {
        let mut stats = DispatchStats {
            eligible: files.len(),
            ..Default::default()
        };
        if files.is_empty() {
            return stats;
        }

        let outcomes: Vec<Outcome> = match self.build_pool() {
            Some(pool) => pool.install(|| files.par_iter().map(|f| self.unit(f)).collect()),
            None => files.iter().map(|f| self.unit(f)).collect(),
        };

        for outcome in outcomes {
            match outcome {
                Outcome::Downloaded => stats.downloaded += 1,
                Outcome::NotFound => stats.not_found += 1,
                Outcome::Failed => stats.failed += 1,
                Outcome::Skipped => stats.skipped += 1,
            }
        }
        stats.interrupted = stats.skipped > 0 || self.context.is_shutdown_requested();

        if stats.interrupted {
            log::info!(
                "Dispatch interrupted: {} files not started",
                stats.skipped
            );
        }
        stats
    }

    fn build_pool(&self) -> Option<rayon::ThreadPool> {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("subseek-worker-{}", i))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Failed to create worker pool, processing sequentially: {}", e);
                None
            }
        }
    }

    /// One unit of work. Shutdown is only checked before the unit starts;
    /// once started it runs to completion, including its cache/log writes.
    fn unit(&self, file: &MediaFile) -> Outcome {
        if self.context.is_shutdown_requested() {
            log::trace!("Not starting {}: shutdown requested", file.path.display());
            return Outcome::Skipped;
        }
        self.process(file)
    }

    fn process(&self, file: &MediaFile) -> Outcome {
        let fingerprint = match self.hasher.fingerprint(&file.path) {
            Ok(fp) => fp,
            Err(e) => {
                log::warn!("Failed to fingerprint {}: {}", file.path.display(), e);
                self.reporter.on_error(&file.path, &e.to_string());
                return Outcome::Failed;
            }
        };

        match self.lookup.lookup(&fingerprint, self.context.languages()) {
            Ok(Lookup::Found(body)) => self.store_subtitle(file, &body),
            Ok(Lookup::NotFound { status }) => {
                self.context.cache().add(&file.path, fingerprint);
                self.reporter.on_not_found(&file.path, status);
                Outcome::NotFound
            }
            Err(e) => {
                log::warn!("Lookup failed for {}: {}", file.path.display(), e);
                self.reporter.on_error(&file.path, &e.to_string());
                Outcome::Failed
            }
        }
    }

    fn store_subtitle(&self, file: &MediaFile, body: &[u8]) -> Outcome {
        if let Err(e) = write_new(&file.subtitle_path, body) {
            log::warn!(
                "Failed to write subtitle {}: {}",
                file.subtitle_path.display(),
                e
            );
            self.reporter.on_error(&file.subtitle_path, &e.to_string());
            return Outcome::Failed;
        }

        self.context.record_download();
        if let Err(e) = self.context.download_log().append(&file.subtitle_path) {
            // The subtitle is on disk, which is what keeps the file out of
            // later scans; a missing log line is only reported.
            log::error!(
                "Failed to log download to {}: {}",
                self.context.download_log().path().display(),
                e
            );
        }
        self.reporter.on_downloaded(&file.path, &file.subtitle_path);
        Outcome::Downloaded
    }
}

/// Write `body` to `path`, which must not exist yet.
///
/// The body goes to a hidden temporary sibling first and is linked into
/// place only once complete, so a failed write never leaves a truncated
/// subtitle behind. An existing subtitle is never replaced.
fn write_new(path: &Path, body: &[u8]) -> io::Result<()> {
    let tmp = temp_sibling(path);
    let result = write_temp(&tmp, body).and_then(|()| publish(&tmp, path));
    if let Err(e) = fs::remove_file(&tmp) {
        if e.kind() != io::ErrorKind::NotFound {
            log::debug!("Failed to remove {}: {}", tmp.display(), e);
        }
    }
    result
}

fn write_temp(tmp: &Path, body: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(tmp)?;
    file.write_all(body)?;
    file.sync_all()
}

/// Move a finished temp file to `path` without overwriting.
fn publish(tmp: &Path, path: &Path) -> io::Result<()> {
    match fs::hard_link(tmp, path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            // Some shares cannot hard-link; fall back to a checked rename.
            log::debug!("Hard link to {} failed ({}), renaming", path.display(), e);
            if fs::symlink_metadata(path).is_ok() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", path.display()),
                ));
            }
            fs::rename(tmp, path)
        }
    }
}

/// `.<name>.part` next to `path`.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".part");
    path.with_file_name(name)
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
