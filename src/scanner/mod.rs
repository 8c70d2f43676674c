//! Scanner module for media discovery and fingerprinting.
//!
//! This module provides functionality for:
//! - Listing a library root once and picking out media files that still
//!   need a subtitle
//! - Computing the boundary-window fingerprint the remote index is keyed by
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory listing and eligibility filtering
//! - [`hasher`]: MD5 fingerprint over the first and last 64 KiB
//!
//! # Example
//!
//! ```no_run
//! use subseek::cache::CacheStore;
//! use subseek::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let cache = CacheStore::new();
//! let walker = Walker::new(Path::new("/media/shows"), WalkerConfig::default());
//! for file in walker.scan(&cache).unwrap_or_default() {
//!     println!("{} -> {}", file.path.display(), file.subtitle_path.display());
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// Re-export main types
pub use hasher::{Hasher, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, WINDOW_SIZE};
pub use walker::Walker;

/// Media extensions recognised by the scanner.
pub const MEDIA_EXTENSIONS: [&str; 3] = ["mkv", "mp4", "avi"];

/// Extension given to downloaded subtitles.
pub const SUBTITLE_EXTENSION: &str = "srt";

/// A media file that lacks a subtitle and has no cached negative result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Path to the media file
    pub path: PathBuf,
    /// Media extension as found on disk
    pub extension: String,
    /// Where a downloaded subtitle will be written
    pub subtitle_path: PathBuf,
}

impl MediaFile {
    /// Create a media file entry, deriving the sibling subtitle path.
    #[must_use]
    pub fn new(path: PathBuf, extension: impl Into<String>) -> Self {
        let subtitle_path = path.with_extension(SUBTITLE_EXTENSION);
        Self {
            path,
            extension: extension.into(),
            subtitle_path,
        }
    }
}

/// Content fingerprint: 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already rendered hex digest.
    #[must_use]
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<md5::Digest> for Fingerprint {
    fn from(digest: md5::Digest) -> Self {
        Self(format!("{digest:x}"))
    }
}

/// Configuration for listing a library root.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Match media and subtitle extensions ignoring ASCII case.
    ///
    /// Off by default: `Movie.MKV` is not a candidate and `clip.SRT` does
    /// not count as a subtitle for `clip.mkv`.
    pub case_insensitive_extensions: bool,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(follow_symlinks: bool, case_insensitive_extensions: bool) -> Self {
        Self {
            follow_symlinks,
            case_insensitive_extensions,
        }
    }
}

/// Errors that make a whole root unusable.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when listing the root.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while listing the root.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while fingerprinting a file.
///
/// Each variant is returned only after every attempt failed.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file was not found on any attempt.
    #[error("File not found after {attempts} attempts: {path}")]
    NotFound {
        /// The file being read
        path: PathBuf,
        /// Number of reads attempted
        attempts: u32,
    },

    /// Permission was denied when reading the file.
    #[error("Permission denied after {attempts} attempts: {path}")]
    PermissionDenied {
        /// The file being read
        path: PathBuf,
        /// Number of reads attempted
        attempts: u32,
    },

    /// Reading kept failing until the attempt ceiling was reached.
    #[error("I/O error for {path} after {attempts} attempts: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Number of reads attempted
        attempts: u32,
        /// The last underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify the last I/O error of an exhausted read.
    pub(crate) fn from_io(path: &Path, attempts: u32, error: std::io::Error) -> Self {
        let path = path.to_path_buf();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path, attempts },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, attempts },
            _ => Self::Io {
                path,
                attempts,
                source: error,
            },
        }
    }

    /// Number of reads attempted before giving up.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::NotFound { attempts, .. }
            | Self::PermissionDenied { attempts, .. }
            | Self::Io { attempts, .. } => *attempts,
        }
    }
}
