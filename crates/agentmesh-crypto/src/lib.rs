//! AgentMesh Crypto - key material and signatures for agent identities.
//!
//! This crate provides:
//! - Ed25519 key pairs whose secret half is zeroized on drop
//! - Fixed-size public keys and signatures with hex/base64 encodings
//! - BLAKE3 content hashing for log-safe fingerprints
//!
//! Nothing here touches the filesystem. Persistence of key material lives in
//! `agentmesh-trust`, which is the only crate that asks for secret bytes.
//!
//! # Example
//!
//! ```
//! use agentmesh_crypto::{ContentHash, KeyPair};
//!
//! let owner = KeyPair::generate();
//!
//! let message = b"agent 7 may act for me";
//! let signature = owner.sign(message);
//! assert!(owner.export_public_key().verify(message, &signature).is_ok());
//!
//! let hash = ContentHash::hash(message);
//! println!("fingerprint: {}", hash.short_hex());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod hash;
mod keypair;
mod signature;

pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use keypair::{KEY_LENGTH, KeyPair, PublicKey};
pub use signature::{SIGNATURE_LENGTH, Signature};
