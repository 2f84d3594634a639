//! # Design
//!
//! - Provide structured, constant-message errors for the ingestion pipeline.
//! - Capture operation context (paths, programs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors produced while watching, stabilising, or analysing files.
#[derive(Debug, Error)]
pub enum IngestError {
    /// IO failures while touching the watched or result directories.
    #[error("ingest io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The analyzer process could not be launched at all.
    #[error("analyzer spawn failure")]
    Spawn {
        /// Program the pipeline attempted to launch.
        program: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Failures establishing or driving the filesystem watch.
    #[error("watch failure")]
    Watch {
        /// Operation that triggered the watch failure.
        operation: &'static str,
        /// Directory being watched.
        path: PathBuf,
        /// Underlying watcher error.
        source: notify::Error,
    },
    /// A directory required by the pipeline does not exist.
    #[error("missing directory")]
    MissingDirectory {
        /// Path of the absent directory.
        path: PathBuf,
    },
}

impl IngestError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn watch(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: notify::Error,
    ) -> Self {
        Self::Watch {
            operation,
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
    fn ingest_error_helpers_build_variants() {
        let io_err = IngestError::io("read_metadata", "/uploads/shape.png", io::Error::other("io"));
        assert!(matches!(io_err, IngestError::Io { .. }));
        assert!(io_err.source().is_some());

        let watch_err = IngestError::watch(
            "subscribe",
            "/uploads",
            notify::Error::generic("watch backend unavailable"),
        );
        assert!(matches!(watch_err, IngestError::Watch { .. }));
        assert!(watch_err.source().is_some());

        let missing = IngestError::MissingDirectory {
            path: PathBuf::from("/uploads"),
        };
        assert!(missing.source().is_none());
    }
}
