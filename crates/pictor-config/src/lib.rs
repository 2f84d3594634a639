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

//! File-backed configuration for the Pictor ingestion pipeline.
//!
//! Layout: `model.rs` (typed config models and defaults), `validate.rs`
//! (normalisation and validation helpers), `loader.rs` (TOML loading).

pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use model::{AnalyzerProfile, PipelineConfig, StabilityPolicy};
