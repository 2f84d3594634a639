//! Filesystem creation watching.
//!
//! # Design
//! - The watch is a capability trait so the service loop can be driven by
//!   synthetic event streams in tests.
//! - The real implementation bridges `notify`'s callback API onto an
//!   unbounded tokio channel; only creation events are forwarded.

use std::path::Path;

use async_trait::async_trait;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{IngestError, IngestResult};
use crate::model::WatchEvent;

/// Source of "entry created" notices for one directory.
#[async_trait]
pub trait CreationWatch: Send {
    /// Receive the next creation notice, or `None` once the watch has ended.
    async fn next(&mut self) -> Option<WatchEvent>;
}

/// Non-recursive creation watch backed by the platform notification backend.
#[derive(Debug)]
pub struct FsCreationWatch {
    // Held for its Drop side effect; dropping it tears the watch down.
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<WatchEvent>,
}

impl FsCreationWatch {
    /// Subscribe to creation events directly under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory does not exist or the platform
    /// watch cannot be established.
    pub fn subscribe(dir: &Path) -> IngestResult<Self> {
        if !dir.is_dir() {
            return Err(IngestError::MissingDirectory {
                path: dir.to_path_buf(),
            });
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |result: Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Create(_)) {
                        return;
                    }
                    for path in event.paths {
                        let is_directory = path.is_dir();
                        let _ = sender.send(WatchEvent { path, is_directory });
                    }
                }
                Err(err) => {
                    warn!(error = %err, "watch backend reported an error");
                }
            },
            Config::default(),
        )
        .map_err(|source| IngestError::watch("create_watcher", dir, source))?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| IngestError::watch("subscribe", dir, source))?;

        Ok(Self {
            _watcher: watcher,
            receiver,
        })
    }
}

#[async_trait]
impl CreationWatch for FsCreationWatch {
    async fn next(&mut self) -> Option<WatchEvent> {
        self.receiver.recv().await
    }
}
