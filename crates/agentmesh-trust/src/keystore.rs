//! Slot persistence inside a data directory.
//!
//! Each slot is a single file, `<data_dir>/<slot>.json`, holding a versioned
//! JSON envelope:
//!
//! ```text
//! { "version": 1, "kind": "agentmesh/keypair", ...record fields... }
//! ```
//!
//! Writes never expose a half-written file. The value is written to a temp
//! file in the same directory, fsynced, and then either linked into place
//! with no-clobber semantics ([`KeyStore::load_or_create`]) or renamed over
//! the old value ([`KeyStore::create`]). Concurrent first use from several
//! threads or processes therefore converges on exactly one persisted value.
//!
//! The data directory itself is the caller's to create.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{TrustError, TrustResult};
use crate::policy::{CURRENT_FORMAT_VERSION, is_supported_version};

/// Slot holding the agent key pair.
pub const AGENT_SLOT: &str = "agent";

/// Slot holding the optional owner key pair.
pub const OWNER_SLOT: &str = "owner";

/// Slot holding the cached delegation certificate.
pub const DELEGATION_SLOT: &str = "delegation";

const SLOT_EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

/// Slots are tiny; anything larger is not ours.
const MAX_SLOT_SIZE: u64 = 65_536;

/// A value that can live in a slot.
pub trait SlotValue: Sized {
    /// Envelope `kind` tag. Loading a slot with a different tag fails.
    const KIND: &'static str;

    /// Serde shape of the envelope body.
    type Record: Serialize + DeserializeOwned;

    /// Convert into the persisted shape.
    fn to_record(&self) -> Self::Record;

    /// Rebuild from the persisted shape, rejecting inconsistent contents.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the record cannot be trusted.
    fn from_record(record: Self::Record) -> Result<Self, String>;
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    version: u32,
    kind: String,
}

#[derive(Serialize)]
struct EnvelopeOut<'a, R> {
    version: u32,
    kind: &'a str,
    #[serde(flatten)]
    record: &'a R,
}

/// File-backed slot storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStore {
    format_version: u32,
}

impl Default for KeyStore {
    fn default() -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION,
        }
    }
}

impl KeyStore {
    /// A store that stamps `format_version` on everything it writes.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidPolicy`] if this build cannot read that version back.
    pub fn with_format_version(format_version: u32) -> TrustResult<Self> {
        if !is_supported_version(format_version) {
            return Err(TrustError::InvalidPolicy {
                reason: format!("storage format version {format_version} is not supported"),
            });
        }
        Ok(Self { format_version })
    }

    /// Version written into new envelopes.
    #[must_use]
    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    /// Path of `slot` inside `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidSlotName`] unless the name is non-empty
    /// lowercase ASCII letters, digits, `_` or `-`.
    pub fn slot_path(data_dir: &Path, slot: &str) -> TrustResult<PathBuf> {
        validate_slot_name(slot)?;
        Ok(data_dir.join(format!("{slot}.{SLOT_EXTENSION}")))
    }

    /// Look a slot up without ever creating it.
    ///
    /// Returns `Ok(None)` when the slot file does not exist.
    ///
    /// # Errors
    ///
    /// - [`TrustError::CorruptPersistedData`] if the file exists but does not
    ///   decode to a valid `T`.
    /// - [`TrustError::StorageIo`] on filesystem errors, including a slot
    ///   path that is a symlink.
    pub fn load<T: SlotValue>(&self, data_dir: &Path, slot: &str) -> TrustResult<Option<T>> {
        let path = Self::slot_path(data_dir, slot)?;

        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TrustError::io(data_dir, slot, e)),
        };
        if meta.file_type().is_symlink() {
            return Err(TrustError::io(
                data_dir,
                slot,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "refusing to read slot: path is a symlink",
                ),
            ));
        }
        if !meta.is_file() {
            return Err(TrustError::corrupt(data_dir, slot, "not a regular file"));
        }
        if meta.len() > MAX_SLOT_SIZE {
            return Err(TrustError::corrupt(
                data_dir,
                slot,
                format!("{} bytes exceeds the {MAX_SLOT_SIZE} byte limit", meta.len()),
            ));
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TrustError::io(data_dir, slot, e)),
        };

        decode(data_dir, slot, &bytes).map(Some)
    }

    /// Return the slot's value, generating and persisting one if it is empty.
    ///
    /// An existing value is never overwritten. If another writer fills the
    /// slot between our lookup and our write, the locally generated value is
    /// discarded and the winner's value is returned.
    ///
    /// # Errors
    ///
    /// Same as [`KeyStore::load`], plus [`TrustError::StorageIo`] if the new
    /// value cannot be written.
    pub fn load_or_create<T, F>(&self, data_dir: &Path, slot: &str, generator: F) -> TrustResult<T>
    where
        T: SlotValue,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.load(data_dir, slot)? {
            tracing::debug!(data_dir = %data_dir.display(), slot, "loaded existing slot");
            return Ok(existing);
        }

        let value = generator();
        let temp = self.write_temp(data_dir, slot, &value)?;
        let path = Self::slot_path(data_dir, slot)?;

        match temp.persist_noclobber(&path) {
            Ok(_) => {
                sync_dir(data_dir).map_err(|e| TrustError::io(data_dir, slot, e))?;
                tracing::info!(data_dir = %data_dir.display(), slot, "created slot");
                Ok(value)
            },
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                // Dropping the temp file removes it.
                drop(e.file);
                tracing::debug!(
                    data_dir = %data_dir.display(),
                    slot,
                    "slot created concurrently; using the persisted value"
                );
                self.load(data_dir, slot)?.ok_or_else(|| {
                    TrustError::io(
                        data_dir,
                        slot,
                        io::Error::new(
                            io::ErrorKind::NotFound,
                            "slot disappeared right after a concurrent create",
                        ),
                    )
                })
            },
            Err(e) => Err(TrustError::io(data_dir, slot, e.error)),
        }
    }

    /// Generate and persist a new value, replacing whatever the slot held.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::StorageIo`] if the value cannot be written.
    pub fn create<T, F>(&self, data_dir: &Path, slot: &str, generator: F) -> TrustResult<T>
    where
        T: SlotValue,
        F: FnOnce() -> T,
    {
        let value = generator();
        let temp = self.write_temp(data_dir, slot, &value)?;
        let path = Self::slot_path(data_dir, slot)?;

        temp.persist(&path)
            .map_err(|e| TrustError::io(data_dir, slot, e.error))?;
        sync_dir(data_dir).map_err(|e| TrustError::io(data_dir, slot, e))?;

        tracing::info!(data_dir = %data_dir.display(), slot, "wrote slot");
        Ok(value)
    }

    /// Take an exclusive advisory lock scoped to `slot` in `data_dir`.
    ///
    /// Blocks until the lock is available. The lock is released when the
    /// returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::StorageIo`] if the lock file cannot be opened or locked.
    pub fn lock_slot(&self, data_dir: &Path, slot: &str) -> TrustResult<SlotLock> {
        use fs2::FileExt;

        validate_slot_name(slot)?;
        let lock_path = data_dir.join(format!("{slot}.{LOCK_EXTENSION}"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| TrustError::io(data_dir, slot, e))?;
        file.lock_exclusive()
            .map_err(|e| TrustError::io(data_dir, slot, e))?;
        Ok(SlotLock { file })
    }

    /// Encode `value` and write it to a fresh temp file next to its slot.
    fn write_temp<T: SlotValue>(
        &self,
        data_dir: &Path,
        slot: &str,
        value: &T,
    ) -> TrustResult<tempfile::NamedTempFile> {
        validate_slot_name(slot)?;
        let record = value.to_record();
        let envelope = EnvelopeOut {
            version: self.format_version,
            kind: T::KIND,
            record: &record,
        };
        let bytes = Zeroizing::new(serde_json::to_vec_pretty(&envelope).map_err(|e| {
            TrustError::io(data_dir, slot, io::Error::new(io::ErrorKind::InvalidData, e))
        })?);

        let prefix = format!(".{slot}.");
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(data_dir)
            .map_err(|e| TrustError::io(data_dir, slot, e))?;
        temp.write_all(&bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| TrustError::io(data_dir, slot, e))?;
        Ok(temp)
    }
}

/// Guard for [`KeyStore::lock_slot`].
///
/// The lock file is left on disk; unlinking it would let a waiter lock an
/// inode nobody else can find.
#[derive(Debug)]
pub struct SlotLock {
    file: File,
}

impl Drop for SlotLock {
    fn drop(&mut self) {
        let _ = <File as fs2::FileExt>::unlock(&self.file);
    }
}

fn validate_slot_name(slot: &str) -> TrustResult<()> {
    let valid = !slot.is_empty()
        && slot
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(TrustError::InvalidSlotName {
            slot: slot.to_owned(),
        })
    }
}

fn decode<T: SlotValue>(data_dir: &Path, slot: &str, bytes: &[u8]) -> TrustResult<T> {
    let header: EnvelopeHeader = serde_json::from_slice(bytes)
        .map_err(|e| TrustError::corrupt(data_dir, slot, format!("unreadable envelope: {e}")))?;

    if !is_supported_version(header.version) {
        return Err(TrustError::corrupt(
            data_dir,
            slot,
            format!("unsupported format version {}", header.version),
        ));
    }
    if header.kind != T::KIND {
        return Err(TrustError::corrupt(
            data_dir,
            slot,
            format!("expected kind '{}', found '{}'", T::KIND, header.kind),
        ));
    }

    let record: T::Record = serde_json::from_slice(bytes)
        .map_err(|e| TrustError::corrupt(data_dir, slot, format!("invalid record: {e}")))?;
    T::from_record(record).map_err(|reason| TrustError::corrupt(data_dir, slot, reason))
}

/// Persist the directory entry itself after a rename or link.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmesh_crypto::KeyPair;

    fn same_key(a: &KeyPair, b: &KeyPair) -> bool {
        a.public_key_bytes() == b.public_key_bytes() && a.secret_key_bytes() == b.secret_key_bytes()
    }

    #[test]
    fn load_of_empty_slot_is_none_and_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();

        let loaded: Option<KeyPair> = store.load(dir.path(), OWNER_SLOT).unwrap();
        assert!(loaded.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn load_or_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();

        let first: KeyPair = store
            .load_or_create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();
        let second: KeyPair = store
            .load_or_create(dir.path(), AGENT_SLOT, || {
                panic!("generator must not run for an existing slot")
            })
            .unwrap();

        assert!(same_key(&first, &second));
    }

    #[test]
    fn load_or_create_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();

        let created: KeyPair = store
            .create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();
        let before = fs::read(dir.path().join("agent.json")).unwrap();

        let loaded: KeyPair = store
            .load_or_create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();

        assert!(same_key(&created, &loaded));
        assert_eq!(fs::read(dir.path().join("agent.json")).unwrap(), before);
    }

    #[test]
    fn create_replaces_existing_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();

        let first: KeyPair = store
            .create(dir.path(), OWNER_SLOT, KeyPair::generate)
            .unwrap();
        let second: KeyPair = store
            .create(dir.path(), OWNER_SLOT, KeyPair::generate)
            .unwrap();
        assert_ne!(first.public_key_bytes(), second.public_key_bytes());

        let loaded: KeyPair = store.load(dir.path(), OWNER_SLOT).unwrap().unwrap();
        assert!(same_key(&second, &loaded));
    }

    #[test]
    fn round_trip_preserves_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();

        let original: KeyPair = store
            .create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();
        let loaded: KeyPair = store.load(dir.path(), AGENT_SLOT).unwrap().unwrap();

        assert_eq!(loaded.public_key_bytes().len(), 32);
        assert_eq!(loaded.secret_key_bytes().len(), 32);
        assert!(same_key(&original, &loaded));
    }

    #[test]
    fn envelope_carries_version_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();
        let _: KeyPair = store
            .create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join("agent.json")).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["kind"], "agentmesh/keypair");
        assert!(raw["public_key"].is_string());
        assert!(raw["secret_key"].is_string());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();

        let _: KeyPair = store
            .load_or_create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();
        let _: KeyPair = store
            .create(dir.path(), OWNER_SLOT, KeyPair::generate)
            .unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["agent.json", "owner.json"]);
    }

    fn write_slot(dir: &Path, contents: &str) {
        fs::write(dir.join("agent.json"), contents).unwrap();
    }

    fn assert_corrupt(dir: &Path) {
        let result: TrustResult<Option<KeyPair>> = KeyStore::default().load(dir, AGENT_SLOT);
        assert!(
            matches!(result, Err(TrustError::CorruptPersistedData { .. })),
            "expected corrupt data error, got {result:?}"
        );

        // load_or_create must not paper over it either.
        let result: TrustResult<KeyPair> =
            KeyStore::default().load_or_create(dir, AGENT_SLOT, KeyPair::generate);
        assert!(matches!(
            result,
            Err(TrustError::CorruptPersistedData { .. })
        ));
    }

    #[test]
    fn truncated_slot_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        write_slot(dir.path(), r#"{"version":1,"kind":"agentmesh/keypair","public_k"#);
        assert_corrupt(dir.path());
    }

    #[test]
    fn empty_slot_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        write_slot(dir.path(), "");
        assert_corrupt(dir.path());
    }

    #[test]
    fn unknown_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();
        let _: KeyPair = store
            .create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();

        let path = dir.path().join("agent.json");
        let mut raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        raw["version"] = serde_json::json!(99);
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        assert_corrupt(dir.path());
    }

    #[test]
    fn wrong_kind_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();
        let _: KeyPair = store
            .create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();

        let path = dir.path().join("agent.json");
        let mut raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        raw["kind"] = serde_json::json!("agentmesh/delegation");
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        assert_corrupt(dir.path());
    }

    #[test]
    fn short_secret_key_is_corrupt() {
        use base64::Engine;
        let dir = tempfile::tempdir().unwrap();
        let kp = KeyPair::generate();
        let short = base64::engine::general_purpose::STANDARD.encode([1u8; 16]);
        write_slot(
            dir.path(),
            &format!(
                r#"{{"version":1,"kind":"agentmesh/keypair","public_key":"{}","secret_key":"{short}"}}"#,
                kp.export_public_key().to_base64()
            ),
        );
        assert_corrupt(dir.path());
    }

    #[test]
    fn mismatched_public_key_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();
        let _: KeyPair = store
            .create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();

        let path = dir.path().join("agent.json");
        let mut raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        raw["public_key"] = serde_json::json!(KeyPair::generate().export_public_key().to_base64());
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        assert_corrupt(dir.path());
    }

    #[test]
    fn oversized_slot_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        write_slot(dir.path(), &" ".repeat(70_000));
        assert_corrupt(dir.path());
    }

    #[test]
    fn missing_data_dir_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created");

        let result: TrustResult<KeyPair> =
            KeyStore::default().load_or_create(&missing, AGENT_SLOT, KeyPair::generate);
        match result {
            Err(TrustError::StorageIo { data_dir, slot, .. }) => {
                assert_eq!(data_dir, missing);
                assert_eq!(slot, AGENT_SLOT);
            },
            other => panic!("expected storage error, got {other:?}"),
        }
        assert!(!missing.exists());
    }

    #[test]
    fn invalid_slot_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();
        for bad in ["", "../agent", "Agent", "a/b", "owner.json"] {
            let result: TrustResult<Option<KeyPair>> = store.load(dir.path(), bad);
            assert!(
                matches!(result, Err(TrustError::InvalidSlotName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn unsupported_store_version_is_rejected() {
        assert!(KeyStore::with_format_version(1).is_ok());
        assert!(KeyStore::with_format_version(0).is_err());
        assert!(KeyStore::with_format_version(7).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn slot_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let _: KeyPair = KeyStore::default()
            .load_or_create(dir.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();

        let perms = fs::metadata(dir.path().join("agent.json"))
            .unwrap()
            .permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_slot_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let store = KeyStore::default();
        let _: KeyPair = store
            .create(elsewhere.path(), AGENT_SLOT, KeyPair::generate)
            .unwrap();
        std::os::unix::fs::symlink(
            elsewhere.path().join("agent.json"),
            dir.path().join("agent.json"),
        )
        .unwrap();

        let result: TrustResult<Option<KeyPair>> = store.load(dir.path(), AGENT_SLOT);
        let err = result.unwrap_err();
        assert!(matches!(err, TrustError::StorageIo { .. }));
        assert!(err.to_string().contains("symlink"));
    }

    #[test]
    fn slot_lock_is_reentrant_across_sequential_guards() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();

        drop(store.lock_slot(dir.path(), DELEGATION_SLOT).unwrap());
        let _again = store.lock_slot(dir.path(), DELEGATION_SLOT).unwrap();
        assert!(dir.path().join("delegation.lock").exists());
    }
}
