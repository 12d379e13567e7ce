//! Config file discovery and loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Read the explicit path if one was given (it must exist), otherwise
//!    `./agentmesh.toml` if present, otherwise start from an empty document
//! 2. Apply env var fallbacks for unset fields
//! 3. Deserialize into [`Config`]
//! 4. Validate

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "agentmesh.toml";

/// Directory created under the home directory when no `data_dir` is set.
pub const DEFAULT_DATA_DIR_NAME: &str = ".agentmesh";

/// Maximum config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load configuration from `explicit`, or `./agentmesh.toml`, or defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
/// result fails validation.
pub fn load(explicit: Option<&Path>) -> ConfigResult<Config> {
    load_from(explicit, Path::new("."), &collect_env_vars())
}

/// [`load`] with the search directory and environment supplied by the caller.
///
/// # Errors
///
/// Same as [`load`].
pub fn load_from<S: BuildHasher>(
    explicit: Option<&Path>,
    search_dir: &Path,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let (merged, source) = match explicit {
        Some(path) => {
            let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            })?;
            info!(path = %path.display(), "loaded config");
            (value, path.display().to_string())
        },
        None => {
            let path = search_dir.join(CONFIG_FILE_NAME);
            let value = try_load_file(&path)?.map_or_else(empty_document, |value| {
                info!(path = %path.display(), "loaded config");
                value
            });
            (value, path.display().to_string())
        },
    };

    finish(merged, &source, env_vars)
}

/// Built-in defaults plus env var fallbacks, ignoring any config file.
///
/// # Errors
///
/// Returns a [`ConfigError`] if an env var supplies an invalid value.
pub fn load_defaults() -> ConfigResult<Config> {
    finish(empty_document(), "<defaults>", &collect_env_vars())
}

fn empty_document() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

/// Apply env fallbacks, deserialize and validate.
fn finish<S: BuildHasher>(
    mut merged: toml::Value,
    source: &str,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let applied = apply_env_fallbacks(&mut merged, env_vars);
    if applied > 0 {
        debug!(count = applied, "applied env var fallbacks");
    }

    let config: Config = merged.try_into().map_err(|e| ConfigError::ParseError {
        path: source.to_owned(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Where this agent keeps its keys: `data_dir` if set, else `~/.agentmesh`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if no `data_dir` is configured and the
/// home directory cannot be determined.
pub fn resolve_data_dir(config: &Config) -> ConfigResult<PathBuf> {
    match &config.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(home_directory()?.join(DEFAULT_DATA_DIR_NAME)),
    }
}

fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let read_error = |source: std::io::Error| ConfigError::ReadError {
        path: path.display().to_string(),
        source,
    };

    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => return Err(read_error(e)),
    };

    // One byte past the cap is enough to tell an oversized file apart.
    let mut content = String::new();
    file.take(MAX_CONFIG_FILE_SIZE.saturating_add(1))
        .read_to_string(&mut content)
        .map_err(read_error)?;

    let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file exceeds the {MAX_CONFIG_FILE_SIZE} byte limit"),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
