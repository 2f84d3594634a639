//! Normalisation and validation for loaded configuration.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::model::PipelineConfig;

/// Normalise and validate a freshly parsed configuration in place.
///
/// Extensions are lowercased and stripped of leading dots, all paths are
/// absolutised against the current working directory, and nonsensical
/// timing values are rejected before the pipeline starts.
///
/// # Errors
///
/// Returns an error for empty or malformed fields and for paths that cannot
/// be absolutised.
pub fn finalize(config: &mut PipelineConfig) -> ConfigResult<()> {
    config.extensions = normalize_extensions(&config.extensions)?;

    if config.stability.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "stability.timeout_secs",
            reason: "must be positive",
            value: Some(config.stability.timeout_secs.to_string()),
        });
    }
    if config.stability.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid {
            field: "stability.poll_interval_ms",
            reason: "must be positive",
            value: Some(config.stability.poll_interval_ms.to_string()),
        });
    }
    if config.stability.poll_interval() > config.stability.timeout() {
        return Err(ConfigError::Invalid {
            field: "stability.poll_interval_ms",
            reason: "must not exceed the stability timeout",
            value: Some(config.stability.poll_interval_ms.to_string()),
        });
    }
    if config.analyzer.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "analyzer.timeout_secs",
            reason: "must be positive",
            value: Some(config.analyzer.timeout_secs.to_string()),
        });
    }

    config.watch_dir = absolutize("watch_dir", &config.watch_dir)?;
    config.result_dir = absolutize("result_dir", &config.result_dir)?;
    config.analyzer.script = absolutize("analyzer.script", &config.analyzer.script)?;

    Ok(())
}

fn normalize_extensions(raw: &[String]) -> ConfigResult<Vec<String>> {
    if raw.is_empty() {
        return Err(ConfigError::Invalid {
            field: "extensions",
            reason: "at least one extension is required",
            value: None,
        });
    }

    let mut normalized = Vec::with_capacity(raw.len());
    for entry in raw {
        let cleaned = entry.trim().trim_start_matches('.').to_ascii_lowercase();
        if cleaned.is_empty() {
            return Err(ConfigError::Invalid {
                field: "extensions",
                reason: "extension entries must be non-empty",
                value: Some(entry.clone()),
            });
        }
        if !normalized.contains(&cleaned) {
            normalized.push(cleaned);
        }
    }
    Ok(normalized)
}

fn absolutize(field: &'static str, path: &Path) -> ConfigResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: "path must be non-empty",
            value: None,
        });
    }
    std::path::absolute(path).map_err(|err| ConfigError::io("absolutize", path, err))
}
