//! AgentMesh Agent CLI
//!
//! Provisions and inspects the cryptographic identity of an agent: its own
//! key, the owner key that vouches for it, and the delegation certificate
//! binding the two.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};

use agentmesh_config::env::DATA_DIR_VAR;
use agentmesh_config::{CONFIG_FILE_NAME, Config};
use agentmesh_trust::TrustManager;
use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config_bridge;
mod theme;

use commands::{cert, init, keys};

/// AgentMesh agent identity and delegation
#[derive(Parser)]
#[command(name = "agentmesh-agent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file (default: ./agentmesh.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding keys and certificates (relative to the
    /// working directory when not absolute)
    #[arg(short, long, global = true, env = DATA_DIR_VAR)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, keys, certificate and config file
    Init {
        /// Replace an existing owner key
        #[arg(long)]
        force: bool,
    },

    /// Inspect and provision keys
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Issue and verify delegation certificates
    Cert {
        #[command(subcommand)]
        command: CertCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Show the agent key, owner key and certificate status
    Show,
    /// Generate a new owner key (prompts if one already exists)
    Owner {
        /// Replace without confirmation
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum CertCommands {
    /// Print the delegation certificate as JSON, issuing one if needed
    Show,
    /// Verify a certificate JSON file
    Verify {
        /// Certificate file
        file: PathBuf,
        /// Expected agent public key (hex); defaults to this data directory's agent
        #[arg(long)]
        agent: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let initializing = matches!(cli.command, Commands::Init { .. });

    let loaded = load_config(cli.config.as_deref(), initializing);

    let log_config = match &loaded {
        Ok(config) => config_bridge::to_log_config(config, cli.verbose),
        Err(_) => config_bridge::fallback_log_config(cli.verbose),
    };
    if let Err(e) = agentmesh_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let config = loaded?;
    let data_dir = config_bridge::resolve_data_dir(&config, cli.data_dir.as_deref())?;
    let trust = TrustManager::new(config_bridge::to_trust_policy(&config))?;
    tracing::debug!(data_dir = %data_dir.display(), "resolved data directory");

    match cli.command {
        Commands::Init { force } => {
            let config_path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            init::run_init(&config, &config_path, &data_dir, &trust, force)?;
        },
        Commands::Keys { command } => match command {
            KeyCommands::Show => keys::show_keys(&data_dir, &trust)?,
            KeyCommands::Owner { force } => keys::provision_owner(&data_dir, &trust, force)?,
        },
        Commands::Cert { command } => match command {
            CertCommands::Show => cert::show_cert(&data_dir, &trust)?,
            CertCommands::Verify { file, agent } => {
                cert::verify_cert(&file, agent.as_deref(), &data_dir, &trust)?;
            },
        },
    }

    Ok(())
}

/// Load the config file. `init` may name a file it is about to create, so
/// in that case a missing file means defaults.
fn load_config(path: Option<&Path>, initializing: bool) -> Result<Config> {
    match path {
        Some(p) if initializing && !p.exists() => Ok(agentmesh_config::loader::load_defaults()?),
        _ => Ok(Config::load(path)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "agentmesh-agent",
            "keys",
            "owner",
            "--force",
            "-d",
            "/srv/agent",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/srv/agent")));
        assert!(matches!(
            cli.command,
            Commands::Keys {
                command: KeyCommands::Owner { force: true }
            }
        ));
    }

    #[test]
    fn parses_cert_verify() {
        let cli =
            Cli::try_parse_from(["agentmesh-agent", "cert", "verify", "peer.json", "--agent", "ab"])
                .unwrap();
        match cli.command {
            Commands::Cert {
                command: CertCommands::Verify { file, agent },
            } => {
                assert_eq!(file, PathBuf::from("peer.json"));
                assert_eq!(agent.as_deref(), Some("ab"));
            },
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn init_tolerates_missing_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.toml");
        assert!(load_config(Some(&path), true).is_ok());
        assert!(load_config(Some(&path), false).is_err());
    }
}
