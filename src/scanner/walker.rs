//! Library root listing and eligibility filtering.
//!
//! # Overview
//!
//! [`Walker`] lists every file under a root exactly once and then decides,
//! from that single snapshot, which media files still need a subtitle. A
//! media file is eligible when:
//!
//! - its extension is one of [`MEDIA_EXTENSIONS`]
//! - no `<stem>.srt` sibling appears in the same listing
//! - its path is not already in the negative-result cache
//!
//! Only a failure to list the root itself is fatal. Unreadable nested
//! entries are logged and skipped.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{MediaFile, ScanError, WalkerConfig, MEDIA_EXTENSIONS, SUBTITLE_EXTENSION};
use crate::cache::CacheStore;

/// One listing entry. Symlinks (when not followed) and other special files
/// count as present siblings but are never candidates themselves.
#[derive(Debug)]
struct ListedEntry {
    path: PathBuf,
    is_file: bool,
}

/// Lists a library root and yields eligible media files.
#[derive(Debug)]
pub struct Walker {
    /// Root path to list
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is raised the listing stops early and whatever was
    /// seen so far is filtered as usual.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root being listed.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// List the root and return the media files still needing a subtitle,
    /// sorted by path.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] if the root is missing, is not a directory,
    /// or cannot be read.
    pub fn scan(&self, cache: &CacheStore) -> Result<Vec<MediaFile>, ScanError> {
        self.check_root()?;
        let listing = self.list_files()?;

        let seen: HashSet<PathBuf> = listing.iter().map(|e| self.match_key(&e.path)).collect();

        let mut eligible = Vec::new();
        for ListedEntry { path, is_file } in &listing {
            if !is_file {
                continue;
            }
            let Some(extension) = self.media_extension(path) else {
                continue;
            };

            let subtitle = path.with_extension(SUBTITLE_EXTENSION);
            if seen.contains(&self.match_key(&subtitle)) {
                log::trace!("Subtitle already present: {}", subtitle.display());
                continue;
            }

            if cache.contains(path) {
                log::trace!("Known to have no match: {}", path.display());
                continue;
            }

            eligible.push(MediaFile::new(path.clone(), extension));
        }
        eligible.sort_by(|a, b| a.path.cmp(&b.path));

        log::debug!(
            "Scanned {}: {} files listed, {} eligible",
            self.root.display(),
            listing.len(),
            eligible.len()
        );
        Ok(eligible)
    }

    fn check_root(&self) -> Result<(), ScanError> {
        let metadata = std::fs::metadata(&self.root)
            .map_err(|e| self.root_error(&self.root, e))?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(ScanError::NotADirectory(self.root.clone()))
        }
    }

    /// Take the one-shot listing of every non-directory entry under the root.
    fn list_files(&self) -> Result<Vec<ListedEntry>, ScanError> {
        let mut files = Vec::new();
        let walk = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        for entry in walk {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping listing");
                break;
            }

            match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if !file_type.is_dir() {
                        files.push(ListedEntry {
                            is_file: file_type.is_file(),
                            path: entry.into_path(),
                        });
                    }
                }
                Err(e) if e.depth() == 0 => {
                    let path = e.path().unwrap_or(self.root.as_path()).to_path_buf();
                    let io = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop at root"));
                    return Err(self.root_error(&path, io));
                }
                Err(e) => {
                    let path = e.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                    log::warn!("Skipping unreadable entry {}: {}", path.display(), e);
                }
            }
        }

        Ok(files)
    }

    /// Media extension of `path` if it is a candidate.
    fn media_extension(&self, path: &Path) -> Option<String> {
        let extension = path.extension()?.to_str()?;
        let is_media = if self.config.case_insensitive_extensions {
            MEDIA_EXTENSIONS
                .iter()
                .any(|m| m.eq_ignore_ascii_case(extension))
        } else {
            MEDIA_EXTENSIONS.contains(&extension)
        };
        is_media.then(|| extension.to_string())
    }

    /// Key used to compare listing entries against expected siblings.
    fn match_key(&self, path: &Path) -> PathBuf {
        if !self.config.case_insensitive_extensions {
            return path.to_path_buf();
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => path.with_extension(ext.to_ascii_lowercase()),
            None => path.to_path_buf(),
        }
    }

    fn root_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        match error.kind() {
            ErrorKind::NotFound => ScanError::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
            _ => ScanError::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
