//! The trust façade handed to the rest of the agent.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use agentmesh_crypto::{KeyPair, PublicKey};

use crate::certificate::DelegationCertificate;
use crate::clock::{Clock, SystemClock};
use crate::error::{TrustResult, VerificationError};
use crate::identity::{AgentIdentity, OwnerIdentity};
use crate::keystore::{AGENT_SLOT, DELEGATION_SLOT, KeyStore, OWNER_SLOT};
use crate::policy::TrustPolicy;

/// Owns the policy, the key store and the clock, and exposes the identity
/// and delegation operations on a data directory.
///
/// Stateless across calls apart from those three: every operation reads and
/// writes the slots in the `data_dir` it is given, so one manager can serve
/// several data directories.
#[derive(Clone)]
pub struct TrustManager {
    policy: TrustPolicy,
    store: KeyStore,
    clock: Arc<dyn Clock>,
}

impl TrustManager {
    /// Create a manager on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidPolicy`](crate::TrustError::InvalidPolicy)
    /// if the policy fails [`TrustPolicy::validate`].
    pub fn new(policy: TrustPolicy) -> TrustResult<Self> {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a manager with an explicit time source.
    ///
    /// # Errors
    ///
    /// Same as [`TrustManager::new`].
    pub fn with_clock(policy: TrustPolicy, clock: Arc<dyn Clock>) -> TrustResult<Self> {
        policy.validate()?;
        let store = KeyStore::with_format_version(policy.format_version)?;
        Ok(Self {
            policy,
            store,
            clock,
        })
    }

    /// Active policy.
    #[must_use]
    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Load the agent identity, generating it on first use.
    ///
    /// # Errors
    ///
    /// Storage errors from the `agent` slot.
    pub fn load_or_create_agent_identity(&self, data_dir: &Path) -> TrustResult<AgentIdentity> {
        let keypair: KeyPair = self
            .store
            .load_or_create(data_dir, AGENT_SLOT, KeyPair::generate)?;
        let agent = AgentIdentity::from_keypair(keypair);
        tracing::debug!(data_dir = %data_dir.display(), key_id = %agent.key_id_hex(), "agent identity ready");
        Ok(agent)
    }

    /// Load the owner identity if one has been provisioned. Never creates one.
    ///
    /// # Errors
    ///
    /// Storage errors from the `owner` slot.
    pub fn load_owner_identity(&self, data_dir: &Path) -> TrustResult<Option<OwnerIdentity>> {
        let keypair: Option<KeyPair> = self.store.load(data_dir, OWNER_SLOT)?;
        Ok(keypair.map(OwnerIdentity::from_keypair))
    }

    /// Generate a new owner identity, replacing any existing one.
    ///
    /// Certificates signed by the previous owner are reissued on the next
    /// [`TrustManager::load_or_create_delegation_certificate`].
    ///
    /// # Errors
    ///
    /// Storage errors from the `owner` slot.
    pub fn create_owner_identity(&self, data_dir: &Path) -> TrustResult<OwnerIdentity> {
        let keypair: KeyPair = self
            .store
            .create(data_dir, OWNER_SLOT, KeyPair::generate)?;
        let owner = OwnerIdentity::from_keypair(keypair);
        tracing::info!(data_dir = %data_dir.display(), key_id = %owner.key_id_hex(), "provisioned owner identity");
        Ok(owner)
    }

    /// Return a certificate in which `owner` delegates to `agent`, reusing the
    /// cached one while it stays valid.
    ///
    /// # Errors
    ///
    /// Storage errors from the `delegation` slot.
    pub fn load_or_create_delegation_certificate(
        &self,
        data_dir: &Path,
        agent: &PublicKey,
        owner: &OwnerIdentity,
    ) -> TrustResult<DelegationCertificate> {
        DelegationCertificate::load_or_issue(
            &self.store,
            data_dir,
            agent,
            owner,
            self.policy.validity_window,
            self.clock.as_ref(),
        )
    }

    /// Read the cached certificate as stored, without checking it.
    ///
    /// # Errors
    ///
    /// Storage errors from the `delegation` slot.
    pub fn load_delegation_certificate(
        &self,
        data_dir: &Path,
    ) -> TrustResult<Option<DelegationCertificate>> {
        self.store.load(data_dir, DELEGATION_SLOT)
    }

    /// Verify a certificate for `expected_agent` against this manager's clock.
    ///
    /// # Errors
    ///
    /// See [`DelegationCertificate::verify_at`].
    pub fn verify_certificate(
        &self,
        cert: &DelegationCertificate,
        expected_agent: &PublicKey,
    ) -> Result<(), VerificationError> {
        cert.verify_at(expected_agent, self.clock.now_millis())
    }
}

impl fmt::Debug for TrustManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustManager")
            .field("policy", &self.policy)
            .field("store", &self.store)
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::TrustError;

    fn manager_at(now: u64) -> (TrustManager, ManualClock) {
        let clock = ManualClock::new(now);
        let manager =
            TrustManager::with_clock(TrustPolicy::default(), Arc::new(clock.clone())).unwrap();
        (manager, clock)
    }

    #[test]
    fn rejects_invalid_policy() {
        let policy = TrustPolicy::default().with_validity_window(Duration::ZERO);
        assert!(matches!(
            TrustManager::new(policy),
            Err(TrustError::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn agent_identity_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TrustManager::new(TrustPolicy::default()).unwrap();

        let a = manager.load_or_create_agent_identity(dir.path()).unwrap();
        let b = manager.load_or_create_agent_identity(dir.path()).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn owner_is_absent_until_created() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TrustManager::new(TrustPolicy::default()).unwrap();

        assert!(manager.load_owner_identity(dir.path()).unwrap().is_none());
        assert!(!dir.path().join("owner.json").exists());

        let created = manager.create_owner_identity(dir.path()).unwrap();
        let loaded = manager.load_owner_identity(dir.path()).unwrap().unwrap();
        assert_eq!(created.public_key(), loaded.public_key());

        let replaced = manager.create_owner_identity(dir.path()).unwrap();
        assert_ne!(created.public_key(), replaced.public_key());
    }

    #[test]
    fn certificate_window_follows_policy() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(1_000);
        let policy = TrustPolicy::default().with_validity_days(1);
        let manager = TrustManager::with_clock(policy, Arc::new(clock)).unwrap();

        let agent = manager.load_or_create_agent_identity(dir.path()).unwrap();
        let owner = manager.create_owner_identity(dir.path()).unwrap();
        let cert = manager
            .load_or_create_delegation_certificate(dir.path(), &agent.public_key(), &owner)
            .unwrap();

        assert_eq!(cert.expires_at(), 86_401_000);
        assert_eq!(
            manager.load_delegation_certificate(dir.path()).unwrap(),
            Some(cert)
        );
    }

    #[test]
    fn verify_uses_manager_clock() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, clock) = manager_at(1_700_000_000_000);

        let agent = manager.load_or_create_agent_identity(dir.path()).unwrap();
        let owner = manager.create_owner_identity(dir.path()).unwrap();
        let cert = manager
            .load_or_create_delegation_certificate(dir.path(), &agent.public_key(), &owner)
            .unwrap();
        assert!(manager.verify_certificate(&cert, &agent.public_key()).is_ok());

        clock.set(cert.expires_at());
        assert!(matches!(
            manager.verify_certificate(&cert, &agent.public_key()),
            Err(VerificationError::Expired { .. })
        ));
    }

    #[test]
    fn no_certificate_until_requested() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager_at(0);
        assert!(manager.load_delegation_certificate(dir.path()).unwrap().is_none());
    }
}
