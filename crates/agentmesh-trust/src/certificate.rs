//! Delegation certificates.
//!
//! A certificate is an owner's signed statement that a specific agent may act
//! on its behalf until `expires_at`. It carries everything a peer needs to
//! check it except the agent key it expects to be talking to.

use std::path::Path;
use std::time::Duration;

use agentmesh_crypto::{ContentHash, PublicKey, Signature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock, duration_millis};
use crate::error::{TrustResult, VerificationError};
use crate::identity::OwnerIdentity;
use crate::keystore::{DELEGATION_SLOT, KeyStore, SlotValue};

/// Version byte at the front of the signed message.
const SIGNING_DATA_VERSION: u8 = 0x01;

/// Domain tag mixed into every signed message.
const SIGNING_DOMAIN: &str = "agentmesh/delegation";

/// Derive-key context for certificate fingerprints.
const FINGERPRINT_DOMAIN: &str = "agentmesh 2025 delegation certificate fingerprint";

/// version + length prefix + domain + two keys + expiry
const SIGNING_DATA_LEN: usize = 97;

/// Write a u32 LE length prefix followed by the bytes.
fn write_length_prefixed(data: &mut Vec<u8>, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    data.extend_from_slice(&len.to_le_bytes());
    data.extend_from_slice(bytes);
}

/// Owner-signed, time-bounded authorization of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationCertificate {
    owner: PublicKey,
    agent: PublicKey,
    /// Unix milliseconds.
    expires_at: u64,
    signature: Signature,
}

impl DelegationCertificate {
    /// Assemble a certificate from fields received from elsewhere.
    ///
    /// Nothing is checked here; call [`DelegationCertificate::verify`] before
    /// trusting the result.
    #[must_use]
    pub fn from_parts(
        owner: PublicKey,
        agent: PublicKey,
        expires_at: u64,
        signature: Signature,
    ) -> Self {
        Self {
            owner,
            agent,
            expires_at,
            signature,
        }
    }

    /// Sign a new certificate for `agent` that expires `validity` after the
    /// clock's current time.
    #[must_use]
    pub fn issue(
        owner: &OwnerIdentity,
        agent: &PublicKey,
        validity: Duration,
        clock: &dyn Clock,
    ) -> Self {
        let owner_key = owner.public_key();
        let expires_at = clock.now_millis().saturating_add(duration_millis(validity));
        let signature = owner.sign(&signing_data(&owner_key, agent, expires_at));

        let cert = Self {
            owner: owner_key,
            agent: *agent,
            expires_at,
            signature,
        };
        tracing::info!(
            owner = %owner_key.key_id_hex(),
            agent = %agent.key_id_hex(),
            expires_at,
            fingerprint = %cert.fingerprint().short_hex(),
            "issued delegation certificate"
        );
        cert
    }

    /// Delegating owner.
    #[must_use]
    pub fn owner(&self) -> &PublicKey {
        &self.owner
    }

    /// Delegated agent.
    #[must_use]
    pub fn agent(&self) -> &PublicKey {
        &self.agent
    }

    /// Expiry in Unix milliseconds.
    #[must_use]
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Expiry as a UTC timestamp, or `None` if it does not fit chrono's range.
    #[must_use]
    pub fn expires_at_datetime(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.expires_at)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Owner's signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The exact bytes the owner signs, rebuilt from this certificate's fields.
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        signing_data(&self.owner, &self.agent, self.expires_at)
    }

    /// Log-safe identifier: a domain-separated hash of the signed message.
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        ContentHash::hash_with_domain(FINGERPRINT_DOMAIN, &self.signing_data())
    }

    /// `true` once `now_millis` has reached `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now_millis: u64) -> bool {
        self.expires_at <= now_millis
    }

    /// Verify against the wall clock.
    ///
    /// # Errors
    ///
    /// See [`DelegationCertificate::verify_at`].
    pub fn verify(&self, expected_agent: &PublicKey) -> Result<(), VerificationError> {
        self.verify_at(expected_agent, SystemClock.now_millis())
    }

    /// Check the certificate is valid for `expected_agent` at `now_millis`.
    ///
    /// # Errors
    ///
    /// In order of precedence:
    /// - [`VerificationError::Expired`] if `expires_at <= now_millis`
    /// - [`VerificationError::AgentMismatch`] if the certificate names another agent
    /// - [`VerificationError::InvalidSignature`] if the signature does not
    ///   verify under the certificate's owner key
    pub fn verify_at(
        &self,
        expected_agent: &PublicKey,
        now_millis: u64,
    ) -> Result<(), VerificationError> {
        if self.is_expired_at(now_millis) {
            return Err(VerificationError::Expired {
                expires_at: self.expires_at,
            });
        }
        if self.agent != *expected_agent {
            return Err(VerificationError::AgentMismatch {
                expected: *expected_agent,
                actual: self.agent,
            });
        }
        // Any crypto failure, including an owner key that is not a curve point.
        self.signature
            .verify(&self.signing_data(), self.owner.as_bytes())
            .map_err(|_| VerificationError::InvalidSignature)
    }

    /// Return the cached certificate for `agent` if it is still good, else
    /// issue and persist a new one.
    ///
    /// The cached certificate is reused only if it verifies for `agent` at
    /// the clock's current time and was signed by `owner`. Callers are
    /// serialized on a lock file in `data_dir`, so concurrent callers end up
    /// sharing one stored certificate.
    ///
    /// # Errors
    ///
    /// Storage errors from the `delegation` slot, including
    /// [`TrustError::CorruptPersistedData`](crate::TrustError::CorruptPersistedData)
    /// for an unreadable cached certificate.
    pub fn load_or_issue(
        store: &KeyStore,
        data_dir: &Path,
        agent: &PublicKey,
        owner: &OwnerIdentity,
        validity: Duration,
        clock: &dyn Clock,
    ) -> TrustResult<Self> {
        let _lock = store.lock_slot(data_dir, DELEGATION_SLOT)?;

        if let Some(cached) = store.load::<Self>(data_dir, DELEGATION_SLOT)? {
            match cached.verify_at(agent, clock.now_millis()) {
                Ok(()) if cached.owner == owner.public_key() => {
                    tracing::debug!(
                        data_dir = %data_dir.display(),
                        fingerprint = %cached.fingerprint().short_hex(),
                        "reusing cached delegation certificate"
                    );
                    return Ok(cached);
                },
                Ok(()) => {
                    tracing::info!(
                        data_dir = %data_dir.display(),
                        cached_owner = %cached.owner.key_id_hex(),
                        owner = %owner.key_id_hex(),
                        "owner changed; reissuing delegation certificate"
                    );
                },
                Err(reason) => {
                    tracing::info!(
                        data_dir = %data_dir.display(),
                        %reason,
                        "cached delegation certificate rejected; reissuing"
                    );
                },
            }
        }

        let cert = store.create(data_dir, DELEGATION_SLOT, || {
            Self::issue(owner, agent, validity, clock)
        })?;
        cert.verify_at(agent, clock.now_millis())?;
        Ok(cert)
    }
}

impl SlotValue for DelegationCertificate {
    const KIND: &'static str = "agentmesh/delegation";
    type Record = Self;

    fn to_record(&self) -> Self {
        self.clone()
    }

    fn from_record(record: Self) -> Result<Self, String> {
        Ok(record)
    }
}

fn signing_data(owner: &PublicKey, agent: &PublicKey, expires_at: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(SIGNING_DATA_LEN);
    data.push(SIGNING_DATA_VERSION);
    write_length_prefixed(&mut data, SIGNING_DOMAIN.as_bytes());
    data.extend_from_slice(owner.as_bytes());
    data.extend_from_slice(agent.as_bytes());
    data.extend_from_slice(&expires_at.to_le_bytes());
    data
}
