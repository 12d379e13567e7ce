//! Init command: provision a data directory and write a config file.

use std::path::Path;

use agentmesh_config::Config;
use agentmesh_trust::TrustManager;

use super::ensure_data_dir;
use crate::theme::Theme;

/// Create the data directory, agent and owner keys, a delegation
/// certificate, and `agentmesh.toml` if it does not exist yet.
///
/// An existing owner key is kept unless `force` is set.
pub(crate) fn run_init(
    config: &Config,
    config_path: &Path,
    data_dir: &Path,
    trust: &TrustManager,
    force: bool,
) -> anyhow::Result<()> {
    ensure_data_dir(data_dir)?;

    let agent = trust.load_or_create_agent_identity(data_dir)?;

    let owner = match trust.load_owner_identity(data_dir)? {
        Some(existing) if !force => {
            println!("{}", Theme::info("Keeping existing owner key (use --force to replace it)."));
            existing
        },
        _ => trust.create_owner_identity(data_dir)?,
    };

    let cert =
        trust.load_or_create_delegation_certificate(data_dir, &agent.public_key(), &owner)?;

    let wrote_config = if config_path.exists() {
        false
    } else {
        let mut written = config.clone();
        written.data_dir = Some(data_dir.to_path_buf());
        let body = written.to_toml()?;
        std::fs::write(config_path, format!("# AgentMesh agent configuration\n\n{body}"))?;
        true
    };

    tracing::info!(data_dir = %data_dir.display(), agent = %agent.key_id_hex(), "initialized agent");

    println!(
        "{}",
        Theme::success(&format!("Initialized agent '{}'", config.name))
    );
    println!("{}", Theme::field("Data dir", &data_dir.display().to_string()));
    println!("{}", Theme::field("Agent", &agent.agent_uri()));
    println!("{}", Theme::field("Owner", &owner.public_key_hex()));
    println!("{}", Theme::field("Expires", &Theme::expiry(cert.expires_at_datetime())));
    if wrote_config {
        println!("{}", Theme::field("Config", &config_path.display().to_string()));
    } else {
        println!(
            "{}",
            Theme::dimmed(&format!("  Left existing {} untouched", config_path.display()))
        );
    }
    println!();

    Ok(())
}
