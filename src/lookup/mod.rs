//! Remote subtitle lookup.
//!
//! A lookup sends one fingerprint and the preferred language codes to the
//! remote index and gets back one of three things:
//!
//! * [`Lookup::Found`]: the subtitle bytes, to be written verbatim.
//! * [`Lookup::NotFound`]: the index answered with a non-success status.
//!   This is a definite negative and is safe to cache.
//! * [`LookupError`]: the exchange itself failed (DNS, reset, timeout).
//!   Nothing is known about the fingerprint, so nothing is cached.
//!
//! The dispatcher only sees the [`SubtitleLookup`] trait; [`SubDbClient`]
//! is the HTTP implementation.

pub mod client;

pub use client::{SubDbClient, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, USER_AGENT};

use crate::scanner::Fingerprint;

/// Answer from the remote index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Subtitle payload, byte-for-byte as served.
    Found(Vec<u8>),
    /// No subtitle for this fingerprint.
    NotFound {
        /// HTTP status returned by the index
        status: u16,
    },
}

/// Transport-level lookup failures.
#[derive(thiserror::Error, Debug)]
pub enum LookupError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request or the response body transfer failed.
    #[error("Lookup of {hash} failed: {source}")]
    Transport {
        /// Fingerprint being looked up
        hash: Fingerprint,
        /// The underlying transport error
        #[source]
        source: reqwest::Error,
    },
}

impl LookupError {
    /// Whether the failure was a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Client(e) | Self::Transport { source: e, .. } => e.is_timeout(),
        }
    }
}

/// Anything that can resolve a fingerprint to a subtitle.
///
/// Implementations are shared across worker threads and are called
/// concurrently.
pub trait SubtitleLookup: Send + Sync {
    /// Look up a subtitle for `fingerprint` in any of `languages`.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`] when the exchange itself fails.
    fn lookup(&self, fingerprint: &Fingerprint, languages: &[String])
        -> Result<Lookup, LookupError>;
}
