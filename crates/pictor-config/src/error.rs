//! # Design
//!
//! - Provide structured, constant-message errors for configuration loading.
//! - Capture operation context (paths, fields, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced while loading or validating pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO failures while reading configuration or resolving paths.
    #[error("config io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// TOML parsing failures.
    #[error("config parse failure")]
    Parse {
        /// Path of the document that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// Field-level validation failures.
    #[error("config invalid field")]
    Invalid {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl ConfigError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_helpers_build_variants() {
        let io_err = ConfigError::io("read", "pictor.toml", io::Error::other("io"));
        assert!(matches!(io_err, ConfigError::Io { .. }));
        assert!(io_err.source().is_some());

        let toml_err = toml::from_str::<toml::Value>("not = [valid").expect_err("invalid toml");
        let parse_err = ConfigError::parse("pictor.toml", toml_err);
        assert!(matches!(parse_err, ConfigError::Parse { .. }));
        assert!(parse_err.source().is_some());
    }
}
