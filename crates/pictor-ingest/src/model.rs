//! Data carriers shared across the ingestion pipeline.

use std::path::PathBuf;

/// A filesystem creation notice delivered by a watch implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Absolute path of the created entry.
    pub path: PathBuf,
    /// Whether the entry was a directory at observation time.
    pub is_directory: bool,
}

/// Verdict of the write-completion detector for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileReadiness {
    /// Two consecutive size readings matched; the file is treated as complete.
    Stable {
        /// Size of the file at the matching readings.
        size_bytes: u64,
    },
    /// The file vanished or kept changing until the window expired.
    NotReady,
}

/// Captured result of one analyzer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code reported by the process, when it terminated normally.
    pub exit_code: Option<i32>,
    /// Captured standard output, decoded lossily as UTF-8.
    pub stdout: String,
    /// Captured standard error, decoded lossily as UTF-8.
    pub stderr: String,
    /// Whether the invocation was terminated for exceeding its time limit.
    pub timed_out: bool,
}

impl ProcessOutcome {
    /// Whether the invocation completed with a zero exit code in time.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}
