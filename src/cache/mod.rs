//! Negative-result cache for subseek.
//!
//! This module remembers which media files were already looked up without a
//! match, so later runs skip them instead of asking the remote index again.
//!
//! # Architecture
//!
//! * [`store`]: The concurrent in-memory map and its JSON persistence.
//! * [`entry`]: The `(path, hash)` record stored on disk.
//!
//! # Lifecycle
//!
//! The store is loaded once before any root is scanned, written to by
//! workers during the run, and saved once when the run ends, whether it
//! completed or was interrupted. Only negative results are recorded: a
//! successful download leaves a sibling subtitle behind, which already
//! keeps the file out of later scans.

pub mod entry;
pub mod store;

pub use entry::CacheEntry;
pub use store::{CacheError, CacheResult, CacheStore};
