//! Command-line interface definitions for subseek.
//!
//! A run has no functional flags: it always processes the configured shows
//! root, then the movies root. The flags here only tune output and point at
//! an alternate config file.
//!
//! # Example
//!
//! ```bash
//! # Normal run using the platform config file
//! subseek
//!
//! # Debug logging with an explicit config file
//! subseek -v --config ~/subseek.toml
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Fetch missing subtitles for local media files by content fingerprint.
#[derive(Debug, Parser)]
#[command(name = "subseek")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors and the final summary
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Path to a TOML config file (defaults to the platform config directory)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
