//! Keys command: inspect and provision identities.

use std::path::Path;

use agentmesh_trust::TrustManager;

use super::ensure_data_dir;
use crate::theme::Theme;

/// Show the agent key, the owner key if any, and the cached certificate.
pub(crate) fn show_keys(data_dir: &Path, trust: &TrustManager) -> anyhow::Result<()> {
    ensure_data_dir(data_dir)?;

    let agent = trust.load_or_create_agent_identity(data_dir)?;
    let owner = trust.load_owner_identity(data_dir)?;

    println!("\n{}", Theme::header("Agent Identity"));
    println!("Agent public key (hex): {}", agent.public_key_hex());
    println!("Agent URI: {}", agent.agent_uri());
    println!("{}", Theme::field("Key ID", &agent.key_id_hex()));

    match &owner {
        Some(owner) => {
            println!("{}", Theme::field("Owner", &owner.public_key_hex()));
        },
        None => println!("{}", Theme::field("Owner", "none (self-sovereign)")),
    }

    if let Some(cert) = trust.load_delegation_certificate(data_dir)? {
        let status = match trust.verify_certificate(&cert, &agent.public_key()) {
            Ok(()) if owner.as_ref().is_some_and(|o| o.public_key() == *cert.owner()) => {
                Theme::expiry(cert.expires_at_datetime())
            },
            Ok(()) => Theme::warning("signed by a previous owner"),
            Err(e) => Theme::warning(&e.to_string()),
        };
        println!("{}", Theme::field("Delegation", &status));
    }

    println!("{}", Theme::dimmed(&format!("  Data dir:   {}", data_dir.display())));
    println!();

    Ok(())
}

/// Provision a new owner key, confirming first if one already exists.
pub(crate) fn provision_owner(
    data_dir: &Path,
    trust: &TrustManager,
    force: bool,
) -> anyhow::Result<()> {
    ensure_data_dir(data_dir)?;

    if trust.load_owner_identity(data_dir)?.is_some() && !force {
        println!(
            "{}",
            Theme::warning("An owner key already exists. This will replace it.")
        );
        println!(
            "{}",
            Theme::warning("The delegation certificate will be reissued under the new owner.")
        );
        println!();

        let confirm = dialoguer::Confirm::new()
            .with_prompt("Replace existing owner key?")
            .default(false)
            .interact()?;

        if !confirm {
            println!("{}", Theme::info("Aborted."));
            return Ok(());
        }
    }

    let owner = trust.create_owner_identity(data_dir)?;

    println!("{}", Theme::success("New owner key generated."));
    println!("{}", Theme::field("Key ID", &owner.key_id_hex()));
    println!("{}", Theme::field("Public key", &owner.public_key_hex()));
    println!();

    Ok(())
}
