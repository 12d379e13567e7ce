//! Configuration types for an AgentMesh agent.
//!
//! Every struct implements [`Default`], so an empty `agentmesh.toml` (or no
//! file at all) yields a working configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root of `agentmesh.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display name of this agent.
    pub name: String,
    /// Where key material and certificates live. Must be absolute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Delegation certificate settings.
    pub trust: TrustSection,
    /// Logging settings.
    pub logging: LoggingSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "my-agent".to_owned(),
            data_dir: None,
            trust: TrustSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

/// `[trust]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustSection {
    /// Days from issuance until a delegation certificate expires.
    pub validity_days: u64,
}

impl Default for TrustSection {
    fn default() -> Self {
        Self { validity_days: 90 }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base filter: a level (`info`) or `EnvFilter` directives such as
    /// `warn,agentmesh_trust=debug`.
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["agentmesh_trust=debug"]`).
    pub directives: Vec<String>,
    /// Where log lines go: `"stderr"`, `"stdout"` or `"file"`.
    pub target: String,
    /// Directory for daily-rotated log files. Required when `target` is
    /// `"file"`; must be absolute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Log file name prefix.
    pub file_prefix: String,
    /// Include source file and line in each event.
    pub file_info: bool,
    /// Log span open and close events.
    pub span_events: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            target: "stderr".to_owned(),
            directory: None,
            file_prefix: "agentmesh".to_owned(),
            file_info: false,
            span_events: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.trust.validity_days, 90);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: Config = toml::from_str(
            r#"
            name = "relay-7"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.name, "relay-7");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.trust, TrustSection::default());
    }

    #[test]
    fn file_logging_section() {
        let config: Config = toml::from_str(
            r#"
            [logging]
            target = "file"
            directory = "/var/log/agentmesh"
            directives = ["agentmesh_trust=debug"]
            span_events = true
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.target, "file");
        assert_eq!(
            config.logging.directory,
            Some(PathBuf::from("/var/log/agentmesh"))
        );
        assert_eq!(config.logging.directives, vec!["agentmesh_trust=debug"]);
        assert_eq!(config.logging.file_prefix, "agentmesh");
        assert!(config.logging.span_events);
        assert!(!config.logging.file_info);
    }
}
