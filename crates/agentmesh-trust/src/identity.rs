//! Agent and owner identities.
//!
//! Both roles are plain Ed25519 key pairs. They differ only in which slot
//! they live in and which side of a delegation certificate they sign or
//! appear on, so the wrappers below exist to keep the two from being mixed
//! up at call sites.

use std::fmt;

use agentmesh_crypto::{KeyPair, PublicKey, Signature};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::keystore::SlotValue;

/// Number of hex characters of the public key shown in an agent URI.
const AGENT_URI_HEX_CHARS: usize = 16;

/// Generate a fresh Ed25519 key pair from the OS CSPRNG.
#[must_use]
pub fn generate() -> KeyPair {
    KeyPair::generate()
}

macro_rules! identity_role {
    ($(#[$doc:meta])* $name:ident, $role:literal) => {
        $(#[$doc])*
        pub struct $name {
            keypair: KeyPair,
        }

        impl $name {
            /// Fresh identity, not persisted anywhere.
            #[must_use]
            pub fn generate() -> Self {
                Self { keypair: generate() }
            }

            pub(crate) fn from_keypair(keypair: KeyPair) -> Self {
                Self { keypair }
            }

            /// Public half of the identity.
            #[must_use]
            pub fn public_key(&self) -> PublicKey {
                self.keypair.export_public_key()
            }

            /// Short, log-safe key ID.
            #[must_use]
            pub fn key_id_hex(&self) -> String {
                self.keypair.key_id_hex()
            }

            /// Full public key as lowercase hex.
            #[must_use]
            pub fn public_key_hex(&self) -> String {
                self.public_key().to_hex()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("role", &$role)
                    .field("key_id", &self.key_id_hex())
                    .finish()
            }
        }
    };
}

identity_role!(
    /// The identity an agent presents to peers.
    AgentIdentity,
    "agent"
);

identity_role!(
    /// The principal that delegates authority to an agent.
    ///
    /// Optional: an agent without an owner runs self-sovereign.
    OwnerIdentity,
    "owner"
);

impl AgentIdentity {
    /// Human-facing address, `agent://` followed by the first 16 hex
    /// characters of the public key.
    #[must_use]
    pub fn agent_uri(&self) -> String {
        let hex = self.public_key_hex();
        let short = hex.get(..AGENT_URI_HEX_CHARS).unwrap_or(&hex);
        format!("agent://{short}...")
    }
}

impl OwnerIdentity {
    pub(crate) fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }
}

/// On-disk shape of a key pair slot.
#[derive(Serialize, Deserialize)]
pub struct KeyPairRecord {
    public_key: PublicKey,
    secret_key: Zeroizing<String>,
}

impl SlotValue for KeyPair {
    const KIND: &'static str = "agentmesh/keypair";
    type Record = KeyPairRecord;

    fn to_record(&self) -> KeyPairRecord {
        let secret = self.secret_key_bytes();
        KeyPairRecord {
            public_key: self.export_public_key(),
            secret_key: Zeroizing::new(BASE64.encode(secret.as_slice())),
        }
    }

    fn from_record(record: KeyPairRecord) -> Result<Self, String> {
        let secret = Zeroizing::new(
            BASE64
                .decode(record.secret_key.as_bytes())
                .map_err(|e| format!("secret key is not valid base64: {e}"))?,
        );
        let keypair = KeyPair::from_secret_key(&secret).map_err(|e| e.to_string())?;
        if keypair.public_key_bytes() != record.public_key.as_bytes() {
            return Err("stored public key does not match the secret key".to_owned());
        }
        Ok(keypair)
    }
}
