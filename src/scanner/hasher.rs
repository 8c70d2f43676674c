//! Boundary-window fingerprint hasher.
//!
//! # Overview
//!
//! The remote index keys subtitles by the MD5 of a file's first 64 KiB
//! followed by its last 64 KiB. [`Hasher`] computes exactly that, so
//! fingerprints match the values stored remotely.
//!
//! Files shorter than the window are read twice from overlapping offsets.
//! The remote scheme does the same, so this must not be "fixed".
//!
//! # Retries
//!
//! Media libraries often live on network shares that drop a read now and
//! then. Any failed read is retried after a fixed delay up to a ceiling,
//! then reported as a [`HashError`] carrying the attempt count.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::thread;
use std::time::Duration;

use super::{Fingerprint, HashError};

/// Size of each sampled window in bytes (64 KiB).
pub const WINDOW_SIZE: usize = 64 * 1024;

/// Default number of read attempts before giving up on a file.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;

/// Default pause between read attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Fingerprint hasher with bounded retry on local I/O failure.
#[derive(Debug, Clone)]
pub struct Hasher {
    max_attempts: u32,
    retry_delay: Duration,
}

impl Hasher {
    /// Create a hasher with the default retry policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Set the maximum number of read attempts (at least one is always made).
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the pause between read attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Maximum number of read attempts.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Compute the fingerprint of a file.
    ///
    /// Every I/O error is retried after the configured delay, including
    /// "not found" and "permission denied", which shares report transiently.
    ///
    /// # Errors
    ///
    /// Once the ceiling is reached, returns [`HashError::NotFound`],
    /// [`HashError::PermissionDenied`] or [`HashError::Io`] according to the
    /// kind of the last error.
    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let mut attempt = 1;
        loop {
            match read_windows(path) {
                Ok(buf) => {
                    let fingerprint = Fingerprint::from(md5::compute(&buf));
                    log::trace!("Fingerprint {} for {}", fingerprint, path.display());
                    return Ok(fingerprint);
                }
                Err(e) if attempt >= self.max_attempts => {
                    return Err(HashError::from_io(path, attempt, e));
                }
                Err(e) => {
                    log::warn!(
                        "Read of {} failed (attempt {}/{}): {}; retrying in {:?}",
                        path.display(),
                        attempt,
                        self.max_attempts,
                        e,
                        self.retry_delay
                    );
                    thread::sleep(self.retry_delay);
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Read `begin || end` where `end` starts `begin.len()` bytes before EOF.
fn read_windows(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = Vec::with_capacity(WINDOW_SIZE * 2);

    let begin_len = read_window(&mut file, &mut buf)?;
    // begin_len <= WINDOW_SIZE, so the cast cannot overflow
    file.seek(SeekFrom::End(-(begin_len as i64)))?;
    read_window(&mut file, &mut buf)?;

    Ok(buf)
}

/// Append up to [`WINDOW_SIZE`] bytes from the current position.
fn read_window(file: &mut File, buf: &mut Vec<u8>) -> io::Result<usize> {
    file.by_ref().take(WINDOW_SIZE as u64).read_to_end(buf)
}
