//! Exit codes.

/// Exit codes for the subseek application.
///
/// - 0: Success (every root scanned, no file failed)
/// - 1: General error (configuration or startup failure)
/// - 3: Partial success (a root could not be scanned or some files failed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success: all roots processed without failures.
    Success = 0,
    /// General error: the run could not start or finish.
    GeneralError = 1,
    /// Partial success: completed with some non-fatal failures.
    PartialSuccess = 3,
    /// Interrupted: stopped early by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "SS000",
            Self::GeneralError => "SS001",
            Self::PartialSuccess => "SS003",
            Self::Interrupted => "SS130",
        }
    }
}
