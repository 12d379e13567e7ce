//! Trust subsystem error types.

use std::io;
use std::path::PathBuf;

use agentmesh_crypto::PublicKey;
use thiserror::Error;

/// Why a delegation certificate was rejected.
///
/// Every variant is recoverable by issuing a fresh certificate; none of them
/// may be recovered from by accepting the certificate anyway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// `expires_at` is at or before the time of the check.
    #[error("delegation certificate expired at {expires_at} (unix ms)")]
    Expired {
        /// Expiry carried by the rejected certificate.
        expires_at: u64,
    },

    /// The certificate binds a different agent.
    #[error(
        "delegation certificate is for agent {}, expected {}",
        .actual.key_id_hex(),
        .expected.key_id_hex()
    )]
    AgentMismatch {
        /// Agent key the caller expected.
        expected: PublicKey,
        /// Agent key found in the certificate.
        actual: PublicKey,
    },

    /// The signature does not verify under the certificate's owner key.
    #[error("delegation certificate signature is invalid")]
    InvalidSignature,
}

/// Errors raised by the key store, certificate issuance, and the trust manager.
///
/// A slot that simply does not exist is not an error: lookups return
/// `Ok(None)` for that case.
#[derive(Debug, Error)]
pub enum TrustError {
    /// A slot exists but its contents cannot be trusted.
    #[error("corrupt '{slot}' slot in {}: {reason}", .data_dir.display())]
    CorruptPersistedData {
        /// Data directory holding the slot.
        data_dir: PathBuf,
        /// Slot name.
        slot: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Reading or writing a slot failed at the filesystem level.
    #[error("storage failure on '{slot}' slot in {}: {source}", .data_dir.display())]
    StorageIo {
        /// Data directory holding the slot.
        data_dir: PathBuf,
        /// Slot name.
        slot: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Slot names must be lowercase ASCII identifiers.
    #[error("invalid slot name '{slot}'")]
    InvalidSlotName {
        /// The rejected name.
        slot: String,
    },

    /// The trust policy handed to the manager is unusable.
    #[error("invalid trust policy: {reason}")]
    InvalidPolicy {
        /// What was wrong with it.
        reason: String,
    },

    /// A certificate failed verification.
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

impl TrustError {
    pub(crate) fn corrupt(
        data_dir: impl Into<PathBuf>,
        slot: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::CorruptPersistedData {
            data_dir: data_dir.into(),
            slot: slot.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(data_dir: impl Into<PathBuf>, slot: &str, source: io::Error) -> Self {
        Self::StorageIo {
            data_dir: data_dir.into(),
            slot: slot.to_owned(),
            source,
        }
    }
}

/// Result type for trust operations.
pub type TrustResult<T> = Result<T, TrustError>;
