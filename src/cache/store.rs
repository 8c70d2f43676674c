//! Concurrent negative-result store with JSON persistence.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::CacheEntry;
use crate::scanner::Fingerprint;

/// Errors that can occur while reading or writing the cache file.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Cache file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not a valid record list.
    #[error("Cache file {path} is corrupt: {source}")]
    Corrupt {
        /// Cache file path
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory map could not be serialized.
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Default)]
struct Entries {
    /// Records in insertion order, as written to disk
    records: Vec<CacheEntry>,
    /// Path -> position in `records`
    index: HashMap<PathBuf, usize>,
}

impl Entries {
    fn insert(&mut self, entry: CacheEntry) -> bool {
        if self.index.contains_key(&entry.path) {
            return false;
        }
        self.index.insert(entry.path.clone(), self.records.len());
        self.records.push(entry);
        true
    }
}

/// Map from media path to a fingerprint known to have no remote match.
///
/// All methods take `&self` and synchronize internally, so one store can be
/// shared across worker threads behind an `Arc` without extra locking.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: RwLock<Entries>,
}

impl CacheStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from `path`, falling back to an empty store.
    ///
    /// A missing file is the normal first-run case. A corrupt or unreadable
    /// file is logged and ignored; it will be replaced on the next save.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(store) => {
                log::debug!(
                    "Loaded {} cached entries from {}",
                    store.count(),
                    path.display()
                );
                store
            }
            Err(e) => {
                log::warn!("Ignoring unusable cache, starting empty: {}", e);
                Self::new()
            }
        }
    }

    /// Load the store from `path`, reporting any problem.
    ///
    /// A missing file yields an empty store. Repeated paths in the file keep
    /// their first fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the file exists but cannot be read and
    /// [`CacheError::Corrupt`] if it does not parse.
    pub fn try_load(path: &Path) -> CacheResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No cache file at {}", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let records: Vec<CacheEntry> =
            serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let store = Self::new();
        {
            let mut entries = store.write();
            for record in records {
                let path = record.path.clone();
                if !entries.insert(record) {
                    log::debug!("Duplicate cache record ignored: {}", path.display());
                }
            }
        }
        Ok(store)
    }

    /// Write a complete snapshot to `path`.
    ///
    /// The snapshot goes to a temporary sibling first and is then renamed
    /// over `path`, so an interrupted save never destroys the previous file.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] if serialization or any file operation fails.
    pub fn save(&self, path: &Path) -> CacheResult<()> {
        let json = {
            let entries = self.read();
            serde_json::to_string_pretty(&entries.records)?
        };

        let io_err = |source: std::io::Error| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = temp_path(path);
        {
            let file = File::create(&tmp_path).map_err(io_err)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(json.as_bytes()).map_err(io_err)?;
            writer.write_all(b"\n").map_err(io_err)?;
            let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp_path, path).map_err(io_err)?;

        log::debug!("Saved {} cache entries to {}", self.count(), path.display());
        Ok(())
    }

    /// Record a negative result. The first fingerprint stored for a path
    /// wins; returns `false` if the path was already present.
    ///
    /// Paths that are not valid UTF-8 have no JSON form; they are logged and
    /// refused with `false`.
    pub fn add(&self, path: &Path, hash: Fingerprint) -> bool {
        if path.to_str().is_none() {
            log::warn!("Not caching non-UTF-8 path: {}", path.display());
            return false;
        }
        if self.contains(path) {
            return false;
        }
        self.write().insert(CacheEntry::new(path, hash))
    }

    /// Whether `path` is known to have no match.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.read().index.contains_key(path)
    }

    /// Cached fingerprint for `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Fingerprint> {
        let entries = self.read();
        entries
            .index
            .get(path)
            .map(|&i| entries.records[i].hash.clone())
    }

    /// Number of cached paths.
    #[must_use]
    pub fn count(&self) -> usize {
        self.read().records.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Snapshot of all records in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.read().records.clone()
    }

    // A panicking worker cannot leave `Entries` half-updated (insert is
    // index-then-push with no fallible step), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "cache.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
