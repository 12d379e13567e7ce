//! Prelude module - commonly used types for convenient import.
//!
//! ```rust
//! use agentmesh_trust::prelude::*;
//!
//! let policy = TrustPolicy::default().with_validity_days(30);
//! assert!(policy.validate().is_ok());
//! ```

pub use crate::{TrustError, TrustResult, VerificationError};

pub use crate::{AgentIdentity, DelegationCertificate, OwnerIdentity};

pub use crate::{Clock, SystemClock, TrustManager, TrustPolicy};
