//! Typed configuration models for the ingestion pipeline.
//!
//! # Design
//! - Pure data carriers deserialised from the TOML document.
//! - Durations are stored as integer fields for serde friendliness and
//!   exposed as [`Duration`] through accessor methods.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Full configuration for one watcher instance.
///
/// An explicit struct rather than process-wide constants so multiple
/// independently configured watchers can coexist and tests can inject fake
/// directories and commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory monitored for newly created image files.
    pub watch_dir: PathBuf,
    /// Directory receiving `<stem>_result.txt` artifacts.
    pub result_dir: PathBuf,
    /// Accepted file extensions, compared case-insensitively without dots.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Write-completion detection settings.
    #[serde(default)]
    pub stability: StabilityPolicy,
    /// External analyzer invocation settings.
    pub analyzer: AnalyzerProfile,
}

impl PipelineConfig {
    /// Whether the given extension (without a leading dot) is accepted.
    #[must_use]
    pub fn is_supported_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(extension))
    }
}

/// Settings for the size-polling write-completion detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityPolicy {
    /// Total window to wait for a file to stop growing, in seconds.
    #[serde(default = "default_stability_timeout_secs")]
    pub timeout_secs: u64,
    /// Interval between size readings, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl StabilityPolicy {
    /// Total window to wait for a stable size.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Interval between consecutive size readings.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for StabilityPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: default_stability_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Settings describing how the external analyzer is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerProfile {
    /// Interpreter binary invoked directly, without any shell indirection.
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,
    /// Path of the analyzer script handed to the interpreter.
    pub script: PathBuf,
    /// Hard wall-clock limit for one invocation, in seconds.
    #[serde(default = "default_analyzer_timeout_secs")]
    pub timeout_secs: u64,
}

impl AnalyzerProfile {
    /// Hard wall-clock limit for one invocation.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "bmp"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

const fn default_stability_timeout_secs() -> u64 {
    20
}

const fn default_poll_interval_ms() -> u64 {
    500
}

fn default_interpreter() -> PathBuf {
    PathBuf::from("python3")
}

const fn default_analyzer_timeout_secs() -> u64 {
    60
}
