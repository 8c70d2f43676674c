//! HTTP client for the SubDB-style download endpoint.
//!
//! One blocking GET per lookup:
//!
//! ```text
//! GET <endpoint>?action=download&hash=<fingerprint>&language=en,us
//! User-Agent: SubDB/1.0 (subseek/<version>)
//! ```
//!
//! `200 OK` carries the subtitle body. Any other status means the index has
//! nothing for that fingerprint.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::{Lookup, LookupError, SubtitleLookup};
use crate::scanner::Fingerprint;

/// Public download endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://api.thesubdb.com/";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client identification; the index rejects requests not starting with `SubDB/1.0`.
pub const USER_AGENT: &str = concat!("SubDB/1.0 (subseek/", env!("CARGO_PKG_VERSION"), ")");

/// Blocking HTTP lookup client.
#[derive(Debug, Clone)]
pub struct SubDbClient {
    client: Client,
    endpoint: String,
}

impl SubDbClient {
    /// Create a client for `endpoint` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Client`] if the underlying HTTP client cannot
    /// be built (e.g. TLS backend initialisation fails).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(LookupError::Client)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SubtitleLookup for SubDbClient {
    fn lookup(
        &self,
        fingerprint: &Fingerprint,
        languages: &[String],
    ) -> Result<Lookup, LookupError> {
        let language = languages.join(",");
        let transport = |source: reqwest::Error| LookupError::Transport {
            hash: fingerprint.clone(),
            source,
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "download"),
                ("hash", fingerprint.as_str()),
                ("language", language.as_str()),
            ])
            .send()
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            log::debug!("No subtitle for {}: HTTP {}", fingerprint, status);
            return Ok(Lookup::NotFound {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(transport)?;
        log::debug!("Subtitle for {}: {} bytes", fingerprint, body.len());
        Ok(Lookup::Found(body.to_vec()))
    }
}
