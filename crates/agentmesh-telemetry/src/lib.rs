//! AgentMesh Telemetry - logging setup for AgentMesh agents.
//!
//! This crate provides:
//! - A serializable [`LogConfig`] with builder methods
//! - Pretty, compact, JSON and full output formats
//! - Stdout, stderr or daily-rotated file targets
//!
//! With the `config` feature, [`LogConfig`] can be built from the
//! `[logging]` section of `agentmesh.toml`.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentmesh_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), agentmesh_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("agentmesh_trust=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
