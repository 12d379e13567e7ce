//! AgentMesh Trust - identity and delegation for agents.
//!
//! This crate provides:
//! - [`KeyStore`]: idempotent, race-safe persistence of key pairs and
//!   certificates in named slots of a data directory
//! - [`AgentIdentity`] / [`OwnerIdentity`]: Ed25519 identities for the two roles
//! - [`DelegationCertificate`]: an owner's signed, time-bounded authorization
//!   of one agent
//! - [`TrustManager`]: the façade tying these to a [`TrustPolicy`] and a [`Clock`]
//!
//! # Example
//!
//! ```no_run
//! use agentmesh_trust::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> TrustResult<()> {
//! let manager = TrustManager::new(TrustPolicy::default())?;
//! let data_dir = Path::new("/var/lib/agentmesh");
//!
//! let agent = manager.load_or_create_agent_identity(data_dir)?;
//! if let Some(owner) = manager.load_owner_identity(data_dir)? {
//!     let cert = manager.load_or_create_delegation_certificate(
//!         data_dir,
//!         &agent.public_key(),
//!         &owner,
//!     )?;
//!     manager.verify_certificate(&cert, &agent.public_key())?;
//! }
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

mod certificate;
mod clock;
mod error;
mod identity;
mod keystore;
mod manager;
mod policy;

pub use certificate::DelegationCertificate;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{TrustError, TrustResult, VerificationError};
pub use identity::{AgentIdentity, KeyPairRecord, OwnerIdentity, generate};
pub use keystore::{AGENT_SLOT, DELEGATION_SLOT, KeyStore, OWNER_SLOT, SlotLock, SlotValue};
pub use manager::TrustManager;
pub use policy::{
    CURRENT_FORMAT_VERSION, DEFAULT_VALIDITY_WINDOW, MAX_VALIDITY_WINDOW, TrustPolicy,
};
