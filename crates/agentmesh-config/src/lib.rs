#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for AgentMesh agents.
//!
//! A single [`Config`] type loaded from `agentmesh.toml`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use agentmesh_config::Config;
//!
//! let config = Config::load(None).unwrap();
//! let data_dir = config.resolve_data_dir().unwrap();
//! println!("{} keeps its keys in {}", config.name, data_dir.display());
//! ```
//!
//! # Sources
//!
//! From highest to lowest priority:
//!
//! 1. **File**: the path passed to [`Config::load`], else `./agentmesh.toml`
//! 2. **Environment variables** (`AGENTMESH_LOG`), fallback only
//! 3. **Built-in defaults**
//!
//! # Design
//!
//! This crate has **no dependencies on other internal agentmesh crates**.
//! Conversion into domain types such as a trust policy happens in the binary.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

use std::path::{Path, PathBuf};

// Re-export primary types at the crate root.
pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_FILE_NAME, DEFAULT_DATA_DIR_NAME};
pub use types::*;

impl Config {
    /// Load configuration from `path`, or `./agentmesh.toml`, or defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable, malformed, or
    /// fails validation.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Directory holding this agent's key material.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if no `data_dir` is set and the
    /// home directory is unknown.
    pub fn resolve_data_dir(&self) -> ConfigResult<PathBuf> {
        loader::resolve_data_dir(self)
    }

    /// Check field ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::ValidationError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }

    /// Render as TOML, as written by `agentmesh-agent init`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeError`] if serialization fails.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
