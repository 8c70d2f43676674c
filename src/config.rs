//! Application configuration management.
//!
//! Settings are layered with figment, later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file (`--config <PATH>`, or `config.toml` in the platform config dir)
//! 3. Environment variables prefixed `SUBSEEK_` (e.g. `SUBSEEK_SHOWS_ROOT`)
//!
//! Everything is resolved once at startup. [`Config::validate`] rejects a
//! configuration that cannot work before any root is scanned.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};

use crate::lookup::DEFAULT_ENDPOINT;
use crate::scanner::{Hasher, WalkerConfig};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "SUBSEEK_";

/// Errors that prevent the run from starting.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A source could not be read or did not match the schema.
    #[error("Invalid configuration: {0}")]
    Load(#[from] figment::Error),

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    /// A required library root is not configured.
    #[error("`{0}` is not set")]
    MissingRoot(&'static str),

    /// A library root is missing on disk or is not a directory.
    #[error("`{name}` is not a directory: {path}")]
    InvalidRoot {
        /// Config key
        name: &'static str,
        /// Configured path
        path: PathBuf,
    },

    /// The language list is empty.
    #[error("`languages` must list at least one language code")]
    NoLanguages,

    /// A numeric setting is out of range.
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// TV shows library root (processed first).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shows_root: Option<PathBuf>,
    /// Movies library root (processed second).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movies_root: Option<PathBuf>,
    /// Preferred subtitle languages. Accepts a list or a comma-separated string.
    #[serde(deserialize_with = "language_list")]
    pub languages: Vec<String>,
    /// Negative-result cache file.
    pub cache_file: PathBuf,
    /// Download log file.
    pub log_file: PathBuf,
    /// Lookup endpoint URL.
    pub endpoint: String,
    /// Lookup request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Read attempts per file before giving up.
    pub io_retry_attempts: u32,
    /// Pause between read attempts in seconds.
    pub io_retry_delay_secs: u64,
    /// Worker count; defaults to the number of CPUs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Match media/subtitle extensions ignoring ASCII case.
    pub case_insensitive_extensions: bool,
    /// Follow symbolic links while listing roots.
    pub follow_symlinks: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            shows_root: None,
            movies_root: None,
            languages: vec!["en".to_string(), "us".to_string()],
            cache_file: data_dir.join("cache.json"),
            log_file: data_dir.join("downloads.log"),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 30,
            io_retry_attempts: crate::scanner::DEFAULT_RETRY_ATTEMPTS,
            io_retry_delay_secs: crate::scanner::DEFAULT_RETRY_DELAY.as_secs(),
            workers: None,
            case_insensitive_extensions: false,
            follow_symlinks: false,
        }
    }
}

impl Config {
    /// Build the layered figment for an optional explicit config file.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let file = config_file
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path);

        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if an explicit file is missing, a source is
    /// malformed, or validation fails.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
        }

        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        log::debug!("Configuration: {:?}", config);
        Ok(config)
    }

    /// Check that the configuration can drive a run.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, root) in [
            ("shows_root", &self.shows_root),
            ("movies_root", &self.movies_root),
        ] {
            let path = root.as_ref().ok_or(ConfigError::MissingRoot(name))?;
            if !path.is_dir() {
                return Err(ConfigError::InvalidRoot {
                    name,
                    path: path.clone(),
                });
            }
        }

        if self.languages.is_empty() {
            return Err(ConfigError::NoLanguages);
        }
        if self.io_retry_attempts == 0 {
            return Err(ConfigError::Zero("io_retry_attempts"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("request_timeout_secs"));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Zero("workers"));
        }
        Ok(())
    }

    /// Library roots in processing order (shows, then movies).
    #[must_use]
    pub fn roots(&self) -> Vec<&Path> {
        [&self.shows_root, &self.movies_root]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
            .collect()
    }

    /// Lookup request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Hasher configured with this retry policy.
    #[must_use]
    pub fn hasher(&self) -> Hasher {
        Hasher::new()
            .with_max_attempts(self.io_retry_attempts)
            .with_retry_delay(Duration::from_secs(self.io_retry_delay_secs))
    }

    /// Listing options for library roots.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.follow_symlinks, self.case_insensitive_extensions)
    }

    /// Default `config.toml` location, if the platform has one.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "subseek", "subseek")
}

/// Accept `["en", "us"]` as well as `"en,us"` (the natural env var form).
fn language_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Languages {
        List(Vec<String>),
        Joined(String),
    }

    let list = match Languages::deserialize(deserializer)? {
        Languages::List(list) => list,
        Languages::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(list
        .into_iter()
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty())
        .collect())
}
