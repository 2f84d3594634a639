#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Image ingestion pipeline: watch a directory, wait for uploads to finish,
//! run the external analyzer, and persist failure diagnostics.
//!
//! Layout: `watch.rs` (creation notifications), `stability.rs`
//! (write-completion detection), `invoke.rs` (bounded analyzer invocation),
//! `results.rs` (result artifacts), `service.rs` (orchestration).

pub mod error;
pub mod invoke;
pub mod model;
pub mod results;
pub mod service;
pub mod stability;
pub mod watch;

pub use error::{IngestError, IngestResult};
pub use invoke::{AnalyzerCommand, AnalyzerRunner};
pub use model::{FileReadiness, ProcessOutcome, WatchEvent};
pub use results::{Recorded, ResultWriter, result_path};
pub use service::IngestService;
pub use watch::{CreationWatch, FsCreationWatch};
