//! Prelude module - commonly used types for convenient import.
//!
//! ```rust
//! use agentmesh_crypto::prelude::*;
//!
//! let keypair = KeyPair::generate();
//! let signature = keypair.sign(b"hello");
//! assert!(keypair.export_public_key().verify(b"hello", &signature).is_ok());
//! ```

pub use crate::{CryptoError, CryptoResult};

pub use crate::{KeyPair, PublicKey, Signature};

pub use crate::ContentHash;
