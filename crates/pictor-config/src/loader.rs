//! TOML file loading for pipeline configuration.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::model::PipelineConfig;
use crate::validate;

/// Load, parse, and validate a pipeline configuration document.
///
/// The returned configuration has lowercase dot-free extensions and
/// absolute paths, ready to hand to the ingestion service.
///
/// # Errors
///
/// Returns an error when the file cannot be read, does not parse as
/// TOML, or fails validation.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<PipelineConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|err| ConfigError::io("read_config", path, err))?;
    let mut config: PipelineConfig =
        toml::from_str(&raw).map_err(|err| ConfigError::parse(path, err))?;
    validate::finalize(&mut config)?;

    info!(
        watch_dir = %config.watch_dir.display(),
        result_dir = %config.result_dir.display(),
        extensions = ?config.extensions,
        "configuration loaded"
    );
    Ok(config)
}
