//! Concurrent lookup dispatch.
//!
//! This module ties the pipeline together for one library root at a time:
//! the [`Dispatcher`] scans the root, fans eligible files out to a bounded
//! worker pool, and records each outcome in the shared [`RunContext`].
//!
//! # Shared state
//!
//! Everything workers share lives in [`RunContext`]:
//!
//! * the negative-result [`CacheStore`] (internally synchronized)
//! * the [`DownloadLog`] (one mutex around each append)
//! * the download counter (atomic)
//! * the shutdown flag (atomic, checked before each unit of work starts)
//!
//! # Completion
//!
//! Each `run`/`run_root` call sets the dispatcher's [`RunCompletion`] latch
//! exactly once, after the pool has joined. A caller on another thread can
//! raise the shutdown flag and then wait on the latch before saving the
//! cache, knowing every started unit has finished its writes.

pub mod dispatcher;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

pub use dispatcher::Dispatcher;

use crate::cache::CacheStore;
use crate::download_log::DownloadLog;

/// Run-scoped state shared by the dispatcher and its workers.
#[derive(Debug)]
pub struct RunContext {
    cache: Arc<CacheStore>,
    download_log: DownloadLog,
    languages: Vec<String>,
    downloads: AtomicUsize,
    shutdown_flag: Arc<AtomicBool>,
}

impl RunContext {
    /// Create a context with its own (unset) shutdown flag.
    #[must_use]
    pub fn new(cache: Arc<CacheStore>, download_log: DownloadLog, languages: Vec<String>) -> Self {
        Self {
            cache,
            download_log,
            languages,
            downloads: AtomicUsize::new(0),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an externally owned shutdown flag (e.g. the Ctrl+C handler's).
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = flag;
        self
    }

    /// Negative-result cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Shared download log.
    #[must_use]
    pub fn download_log(&self) -> &DownloadLog {
        &self.download_log
    }

    /// Preferred subtitle language codes.
    #[must_use]
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Clone of the shutdown flag for other components.
    #[must_use]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_flag)
    }

    /// Ask workers to stop picking up new files.
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Count one successful download.
    pub fn record_download(&self) {
        self.downloads.fetch_add(1, Ordering::SeqCst);
    }

    /// Downloads so far. Exact once all workers have joined.
    #[must_use]
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct CompletionState {
    done: bool,
    completions: u64,
}

/// Latch set once per dispatcher run.
///
/// The latch is per call: each `run`/`run_root` clears it on entry and sets
/// it on exit. A waiter arriving between two roots therefore still sees the
/// previous root's `done`. To wait for a specific run, read
/// [`completions`](Self::completions) first and then use
/// [`wait_for_completions`](Self::wait_for_completions).
#[derive(Debug, Default)]
pub struct RunCompletion {
    state: Mutex<CompletionState>,
    cond: Condvar,
}

impl RunCompletion {
    /// Create an unset latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the latch at the start of a run.
    pub(crate) fn reset(&self) {
        self.lock().done = false;
    }

    /// Set the latch and wake all waiters.
    pub(crate) fn complete(&self) {
        let mut state = self.lock();
        state.done = true;
        state.completions += 1;
        self.cond.notify_all();
    }

    /// Whether the current (or last) run has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lock().done
    }

    /// Number of runs that have completed on this latch.
    #[must_use]
    pub fn completions(&self) -> u64 {
        self.lock().completions
    }

    /// Block until the latch is set.
    pub fn wait(&self) {
        let state = self.lock();
        let _done = self
            .cond
            .wait_while(state, |s| !s.done)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until at least `count` runs have completed on this latch.
    pub fn wait_for_completions(&self, count: u64) {
        let state = self.lock();
        let _done = self
            .cond
            .wait_while(state, |s| s.completions < count)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until the latch is set or `timeout` elapses. Returns whether
    /// the latch was set.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .cond
            .wait_timeout_while(state, timeout, |s| !s.done)
            .unwrap_or_else(PoisonError::into_inner);
        state.done
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CompletionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sets the latch when dropped, so every exit path of a run completes it.
pub(crate) struct CompleteOnDrop<'a>(pub(crate) &'a RunCompletion);

impl Drop for CompleteOnDrop<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Outcome counts for one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Files handed to the dispatcher
    pub eligible: usize,
    /// Subtitles written
    pub downloaded: usize,
    /// Files the index had nothing for (now cached)
    pub not_found: usize,
    /// Files that failed to hash, look up, or write
    pub failed: usize,
    /// Files never started because shutdown was requested
    pub skipped: usize,
    /// Whether shutdown cut the dispatch short
    pub interrupted: bool,
}

/// Result of processing one library root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSummary {
    /// The root that was processed
    pub root: PathBuf,
    /// Dispatch outcome counts
    pub stats: DispatchStats,
    /// Whether the root could not be listed at all
    pub scan_failed: bool,
}

impl RootSummary {
    /// Whether anything under this root went wrong.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.scan_failed || self.stats.failed > 0
    }
}

/// Result of a whole run across all roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Per-root results in processing order
    pub roots: Vec<RootSummary>,
    /// Total subtitles downloaded
    pub downloads: usize,
    /// Entries in the cache after the run
    pub cached_entries: usize,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl RunSummary {
    /// Whether any root or file failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.roots.iter().any(RootSummary::has_failures)
    }
}
