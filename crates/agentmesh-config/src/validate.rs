//! Configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Longest delegation validity accepted, in days.
pub const MAX_VALIDITY_DAYS: u64 = 3650;

/// Validate a deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_name(config)?;
    validate_data_dir(config)?;
    validate_trust(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_name(config: &Config) -> ConfigResult<()> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "name".to_owned(),
            message: "agent name must not be empty".to_owned(),
        });
    }
    Ok(())
}

fn validate_data_dir(config: &Config) -> ConfigResult<()> {
    if let Some(dir) = &config.data_dir
        && !dir.is_absolute()
    {
        return Err(ConfigError::ValidationError {
            field: "data_dir".to_owned(),
            message: format!("'{}' must be an absolute path", dir.display()),
        });
    }
    Ok(())
}

fn validate_trust(config: &Config) -> ConfigResult<()> {
    let days = config.trust.validity_days;
    if days == 0 || days > MAX_VALIDITY_DAYS {
        return Err(ConfigError::ValidationError {
            field: "trust.validity_days".to_owned(),
            message: format!("{days} is out of range; must be between 1 and {MAX_VALIDITY_DAYS}"),
        });
    }
    Ok(())
}

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

fn is_level(s: &str) -> bool {
    LEVELS.iter().any(|l| l.eq_ignore_ascii_case(s))
}

/// `level` or `target=level`, the subset of `EnvFilter` syntax accepted here.
fn is_directive(directive: &str) -> bool {
    match directive.rsplit_once('=') {
        Some((target, level)) => {
            !target.is_empty() && !target.contains(char::is_whitespace) && is_level(level)
        },
        None => is_level(directive),
    }
}

fn directive_error(field: &str, value: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: format!(
            "unsupported filter '{value}'; expected a level ({}) or target=level directives",
            LEVELS.join(", ")
        ),
    }
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;

    let mut parts = logging
        .level
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .peekable();
    if parts.peek().is_none() || !parts.all(is_directive) {
        return Err(directive_error("logging.level", &logging.level));
    }
    if let Some(bad) = logging.directives.iter().find(|d| !is_directive(d.trim())) {
        return Err(directive_error("logging.directives", bad));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    let valid_targets = ["stderr", "stdout", "file"];
    if !valid_targets.contains(&logging.target.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.target".to_owned(),
            message: format!(
                "unsupported log target '{}'; expected one of: {}",
                logging.target,
                valid_targets.join(", ")
            ),
        });
    }

    match &logging.directory {
        None if logging.target == "file" => {
            return Err(ConfigError::ValidationError {
                field: "logging.directory".to_owned(),
                message: "required when target is \"file\"".to_owned(),
            });
        },
        Some(dir) if !dir.is_absolute() => {
            return Err(ConfigError::ValidationError {
                field: "logging.directory".to_owned(),
                message: format!("'{}' must be an absolute path", dir.display()),
            });
        },
        _ => {},
    }

    if logging.file_prefix.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.file_prefix".to_owned(),
            message: "log file prefix must not be empty".to_owned(),
        });
    }

    Ok(())
}
