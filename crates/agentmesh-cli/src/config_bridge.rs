//! Bridge from `agentmesh_config::Config` to domain types.
//!
//! The config crate stays free of internal dependencies; conversion into
//! trust and telemetry types happens here, at the binary's boundary.

use std::path::{Path, PathBuf};

use agentmesh_config::Config;
use agentmesh_telemetry::{LogConfig, LogFormat};
use agentmesh_trust::TrustPolicy;
use anyhow::Context;

/// Trust policy described by the `[trust]` section.
pub(crate) fn to_trust_policy(config: &Config) -> TrustPolicy {
    TrustPolicy::default().with_validity_days(config.trust.validity_days)
}

/// Log configuration for the `[logging]` section, with `--verbose` forcing
/// debug output.
pub(crate) fn to_log_config(config: &Config, verbose: bool) -> LogConfig {
    let mut log_config = LogConfig::from_section(&config.logging)
        .unwrap_or_else(|_| LogConfig::new(config.logging.level.clone()));
    if verbose {
        "debug".clone_into(&mut log_config.level);
    }
    log_config
}

/// Logging used when the config file itself could not be loaded.
pub(crate) fn fallback_log_config(verbose: bool) -> LogConfig {
    let level = if verbose { "debug" } else { "info" };
    LogConfig::new(level).with_format(LogFormat::Compact)
}

/// The data directory to operate on: `--data-dir` if given (relative paths
/// are taken from the working directory), else the configured one.
pub(crate) fn resolve_data_dir(config: &Config, cli_override: Option<&Path>) -> anyhow::Result<PathBuf> {
    match cli_override {
        Some(dir) if dir.is_absolute() => Ok(dir.to_path_buf()),
        Some(dir) => Ok(std::env::current_dir()
            .context("cannot determine the working directory")?
            .join(dir)),
        None => Ok(config.resolve_data_dir()?),
    }
}
