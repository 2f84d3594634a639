//! Failure result persistence.
//!
//! # Design
//! - Successful analyzer runs write their own artifact; this module only
//!   records diagnostics when an invocation fails.
//! - Existing non-empty artifacts are never overwritten, so a failure
//!   observed after a success cannot clobber real output.
//! - Write failures are logged and swallowed: result persistence must never
//!   take the pipeline down.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::model::ProcessOutcome;

/// Marker recorded when a failed invocation produced no diagnostics at all.
const UNKNOWN_ERROR: &str = "unknown error";

/// Compute the result artifact path for an input file.
///
/// `/uploads/photo.png` maps to `<result_dir>/photo_result.txt`; inputs with
/// no stem fall back to the whole file name.
#[must_use]
pub fn result_path(result_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .or_else(|| input.file_name())
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
    result_dir.join(format!("{stem}_result.txt"))
}

/// Disposition of one recorded invocation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// The invocation succeeded; the artifact belongs to the analyzer.
    Success,
    /// A failure diagnostic was written to the artifact.
    FailureWritten(String),
    /// A failure was observed but no new artifact content was written.
    FailureKept(String),
}

impl Recorded {
    /// The failure diagnostic, when the outcome was a failure.
    #[must_use]
    pub fn failure_message(self) -> Option<String> {
        match self {
            Self::Success => None,
            Self::FailureWritten(message) | Self::FailureKept(message) => Some(message),
        }
    }
}

/// Persists diagnostics for failed analyzer invocations.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    result_dir: PathBuf,
}

impl ResultWriter {
    /// Construct a writer targeting the configured result directory.
    #[must_use]
    pub fn new(result_dir: impl Into<PathBuf>) -> Self {
        Self {
            result_dir: result_dir.into(),
        }
    }

    /// Record the outcome of one invocation.
    #[must_use]
    pub fn record(&self, input: &Path, outcome: &ProcessOutcome) -> Recorded {
        if outcome.success() {
            let artifact = result_path(&self.result_dir, input);
            match std::fs::metadata(&artifact) {
                Ok(metadata) if metadata.len() > 0 => {}
                _ => {
                    warn!(
                        path = %artifact.display(),
                        input = %input.display(),
                        "analyzer reported success but wrote no artifact"
                    );
                }
            }
            return Recorded::Success;
        }

        let message = Self::failure_message(outcome);
        if self.record_failure_message(input, &message) {
            Recorded::FailureWritten(message)
        } else {
            Recorded::FailureKept(message)
        }
    }

    /// Write a diagnostic message for a file whose analysis failed.
    ///
    /// The write is skipped when a non-empty artifact already exists at the
    /// result path. Returns whether a new artifact was written.
    #[must_use]
    pub fn record_failure_message(&self, input: &Path, message: &str) -> bool {
        let artifact = result_path(&self.result_dir, input);

        if let Ok(metadata) = std::fs::metadata(&artifact)
            && metadata.len() > 0
        {
            warn!(
                path = %artifact.display(),
                input = %input.display(),
                "result artifact already present; keeping existing content"
            );
            return false;
        }

        if let Err(err) = std::fs::write(&artifact, message) {
            warn!(
                error = %err,
                path = %artifact.display(),
                input = %input.display(),
                "failed to write result artifact"
            );
            return false;
        }
        true
    }

    fn failure_message(outcome: &ProcessOutcome) -> String {
        let stderr = outcome.stderr.trim();
        if !stderr.is_empty() {
            return format!("error: {stderr}");
        }
        let stdout = outcome.stdout.trim();
        if !stdout.is_empty() {
            return format!("error: {stdout}");
        }
        format!("error: {UNKNOWN_ERROR}")
    }
}
