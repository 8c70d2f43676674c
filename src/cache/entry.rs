//! Cache entry definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scanner::Fingerprint;

/// A media path whose fingerprint is known to have no remote match.
///
/// Serialized as `{ "path": ..., "hash": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Path of the media file
    pub path: PathBuf,
    /// Fingerprint that came back without a match
    pub hash: Fingerprint,
}

impl CacheEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, hash: Fingerprint) -> Self {
        Self {
            path: path.into(),
            hash,
        }
    }
}
