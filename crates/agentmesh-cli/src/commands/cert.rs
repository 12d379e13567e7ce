//! Cert command: issue, print and verify delegation certificates.

use std::path::Path;

use agentmesh_crypto::PublicKey;
use agentmesh_trust::{DelegationCertificate, TrustManager};
use anyhow::{Context, bail};

use super::ensure_data_dir;
use crate::theme::Theme;

/// Certificates are a few hundred bytes; refuse to slurp anything large.
const MAX_CERT_FILE_SIZE: u64 = 65_536;

/// Print the current delegation certificate as JSON, issuing one if needed.
pub(crate) fn show_cert(data_dir: &Path, trust: &TrustManager) -> anyhow::Result<()> {
    ensure_data_dir(data_dir)?;

    let agent = trust.load_or_create_agent_identity(data_dir)?;
    let Some(owner) = trust.load_owner_identity(data_dir)? else {
        bail!(
            "no owner key in {}; run `agentmesh-agent keys owner` first",
            data_dir.display()
        );
    };

    let cert =
        trust.load_or_create_delegation_certificate(data_dir, &agent.public_key(), &owner)?;

    println!("{}", serde_json::to_string_pretty(&cert)?);
    eprintln!(
        "{}",
        Theme::dimmed(&format!(
            "fingerprint {} · expires {}",
            cert.fingerprint().short_hex(),
            Theme::expiry(cert.expires_at_datetime())
        ))
    );
    Ok(())
}

/// Verify a certificate file for `agent_hex`, or for this data directory's
/// agent when no key is given.
pub(crate) fn verify_cert(
    file: &Path,
    agent_hex: Option<&str>,
    data_dir: &Path,
    trust: &TrustManager,
) -> anyhow::Result<()> {
    let cert = read_cert(file)?;

    let expected = match agent_hex {
        Some(hex) => PublicKey::from_hex(hex).context("--agent is not a 32-byte hex key")?,
        None => {
            ensure_data_dir(data_dir)?;
            trust.load_or_create_agent_identity(data_dir)?.public_key()
        },
    };

    if let Err(e) = trust.verify_certificate(&cert, &expected) {
        println!("{}", Theme::error(&format!("Certificate rejected: {e}")));
        bail!("verification of {} failed: {e}", file.display());
    }

    println!("{}", Theme::success("Certificate is valid."));
    println!("{}", Theme::field("Owner", &cert.owner().to_hex()));
    println!("{}", Theme::field("Agent", &cert.agent().to_hex()));
    println!("{}", Theme::field("Expires", &Theme::expiry(cert.expires_at_datetime())));
    println!("{}", Theme::field("Fingerprint", &cert.fingerprint().short_hex()));
    println!();
    Ok(())
}

fn read_cert(file: &Path) -> anyhow::Result<DelegationCertificate> {
    let meta = std::fs::metadata(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    if meta.len() > MAX_CERT_FILE_SIZE {
        bail!(
            "{} is {} bytes; certificates are far smaller",
            file.display(),
            meta.len()
        );
    }
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a delegation certificate", file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmesh_trust::TrustPolicy;

    fn provisioned() -> (tempfile::TempDir, TrustManager, DelegationCertificate, PublicKey) {
        let dir = tempfile::tempdir().unwrap();
        let trust = TrustManager::new(TrustPolicy::default()).unwrap();
        let agent = trust.load_or_create_agent_identity(dir.path()).unwrap();
        let owner = trust.create_owner_identity(dir.path()).unwrap();
        let cert = trust
            .load_or_create_delegation_certificate(dir.path(), &agent.public_key(), &owner)
            .unwrap();
        (dir, trust, cert, agent.public_key())
    }

    #[test]
    fn read_cert_round_trips_json() {
        let (dir, _, cert, _) = provisioned();
        let file = dir.path().join("peer-cert.json");
        std::fs::write(&file, serde_json::to_string(&cert).unwrap()).unwrap();

        assert_eq!(read_cert(&file).unwrap(), cert);
    }

    #[test]
    fn read_cert_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("junk.json");
        std::fs::write(&file, "{\"owner\": 1}").unwrap();
        assert!(read_cert(&file).is_err());
    }

    #[test]
    fn verify_against_explicit_agent() {
        let (dir, trust, cert, agent) = provisioned();
        let file = dir.path().join("peer-cert.json");
        std::fs::write(&file, serde_json::to_string(&cert).unwrap()).unwrap();

        assert!(verify_cert(&file, Some(&agent.to_hex()), dir.path(), &trust).is_ok());

        let stranger = agentmesh_crypto::KeyPair::generate().export_public_key();
        assert!(verify_cert(&file, Some(&stranger.to_hex()), dir.path(), &trust).is_err());
        assert!(verify_cert(&file, Some("not-hex"), dir.path(), &trust).is_err());
    }

    #[test]
    fn verify_defaults_to_local_agent() {
        let (dir, trust, cert, _) = provisioned();
        let file = dir.path().join("own-cert.json");
        std::fs::write(&file, serde_json::to_string(&cert).unwrap()).unwrap();

        assert!(verify_cert(&file, None, dir.path(), &trust).is_ok());
    }
}
