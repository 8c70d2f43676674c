//! Append-only record of downloaded subtitles.
//!
//! One subtitle path per line. A new log starts with a `# created <time>`
//! line. Workers share one [`DownloadLog`]; appends are serialized by a
//! mutex held only for the write itself.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Shared append target for downloaded subtitle paths.
#[derive(Debug)]
pub struct DownloadLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl DownloadLog {
    /// Open the log at `path`, creating it (and its parent directories)
    /// with a timestamp header if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from creating or opening the file.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if is_new {
            writeln!(file, "# created {}", chrono::Local::now().to_rfc3339())?;
            file.flush()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Append one subtitle path as a line.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the write.
    pub fn append(&self, subtitle: &Path) -> io::Result<()> {
        let line = format!("{}\n", subtitle.display());
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())?;
        file.flush()
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
