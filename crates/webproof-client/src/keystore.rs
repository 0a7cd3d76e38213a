//! Ephemeral signing keys for token holders.
//!
//! A token-mode client never holds the application secret; it signs its
//! proof requests with a locally generated key instead. The key is keyed
//! by application id and persisted when a store is available, so the same
//! holder keeps the same downstream identity across process lifetimes.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};
use webproof_crypto::KeyIdentity;

/// Storage for ephemeral key material, keyed by application id.
///
/// Implementations are best-effort with last-writer-wins semantics: a
/// store that cannot persist reports `false` from [`store`](Self::store)
/// and the caller proceeds with an in-memory key. Nothing here returns an
/// error.
pub trait KeyStore: Send + Sync {
    /// Load the stored value for an application id, if any.
    fn load(&self, application_id: &str) -> Option<String>;

    /// Persist a value for an application id. Returns `false` when the
    /// storage medium is unavailable.
    fn store(&self, application_id: &str, secret_hex: &str) -> bool;

    /// Remove a stored value (used to clear stale entries).
    fn remove(&self, application_id: &str);
}

/// In-memory key store. Keys live for the process lifetime only.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self, application_id: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|map| map.get(&normalize(application_id)).cloned())
    }

    fn store(&self, application_id: &str, secret_hex: &str) -> bool {
        match self.entries.write() {
            Ok(mut map) => {
                map.insert(normalize(application_id), secret_hex.to_string());
                true
            },
            Err(_) => false,
        }
    }

    fn remove(&self, application_id: &str) {
        if let Ok(mut map) = self.entries.write() {
            map.remove(&normalize(application_id));
        }
    }
}

/// Filesystem key store: one file per application id under a directory.
///
/// Files are written with mode 0o600 on Unix so key material is never
/// world-readable, and symlinked key files are refused on read.
pub struct FsKeyStore {
    dir: PathBuf,
}

impl FsKeyStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write; an uncreatable directory degrades to "unavailable".
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, application_id: &str) -> PathBuf {
        self.dir.join(format!("{}.key", normalize(application_id)))
    }
}

impl KeyStore for FsKeyStore {
    fn load(&self, application_id: &str) -> Option<String> {
        let path = self.key_path(application_id);

        // Refuse symlinks (prevents symlink attacks redirecting to another file).
        let meta = std::fs::symlink_metadata(&path).ok()?;
        if meta.file_type().is_symlink() {
            warn!(path = %path.display(), "refusing to read key file: path is a symlink");
            return None;
        }

        let contents = std::fs::read_to_string(&path).ok()?;
        Some(contents.trim().to_string())
    }

    fn store(&self, application_id: &str, secret_hex: &str) -> bool {
        if std::fs::create_dir_all(&self.dir).is_err() {
            return false;
        }
        let path = self.key_path(application_id);
        write_private(&path, secret_hex).is_some()
    }

    fn remove(&self, application_id: &str) {
        let _ = std::fs::remove_file(self.key_path(application_id));
    }
}

/// Write a key file with owner-only permissions.
#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> Option<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .ok()?;
    file.write_all(contents.as_bytes()).ok()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> Option<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .ok()?;
    file.write_all(contents.as_bytes()).ok()
}

/// Application ids compare case-insensitively, so storage keys do too.
fn normalize(application_id: &str) -> String {
    application_id.to_lowercase()
}

/// Obtains or creates the ephemeral signing key for an application id.
pub struct EphemeralKeyManager {
    store: Arc<dyn KeyStore>,
}

impl EphemeralKeyManager {
    /// Create a manager over a key store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// Create a manager with in-memory storage (session-scoped identity).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyStore::new()))
    }

    /// Create a manager persisting keys under `dir`.
    #[must_use]
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsKeyStore::new(dir)))
    }

    /// Get the key for an application id, creating it on first use.
    ///
    /// A stored value that no longer parses as a private key is treated as
    /// absent and removed. Persistence of a fresh key is best-effort: when
    /// the store is unavailable the key is simply session-scoped.
    #[must_use]
    pub fn get_or_create(&self, application_id: &str) -> KeyIdentity {
        if let Some(stored) = self.store.load(application_id) {
            match KeyIdentity::from_hex(&stored) {
                Ok(key) => {
                    debug!(application_id, "reusing persisted ephemeral key");
                    return key;
                },
                Err(_) => {
                    warn!(application_id, "stored ephemeral key is corrupt, replacing");
                    self.store.remove(application_id);
                },
            }
        }

        let key = KeyIdentity::generate();
        if !self.store.store(application_id, &key.secret_hex()) {
            warn!(
                application_id,
                "key store unavailable; ephemeral key is session-scoped"
            );
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotent_retrieval() {
        let manager = EphemeralKeyManager::in_memory();

        let first = manager.get_or_create("app-1");
        let second = manager.get_or_create("app-1");
        assert_eq!(first.address(), second.address());
        assert_eq!(*first.secret_hex(), *second.secret_hex());
    }

    #[test]
    fn test_distinct_apps_get_distinct_keys() {
        let manager = EphemeralKeyManager::in_memory();
        let a = manager.get_or_create("app-a");
        let b = manager.get_or_create("app-b");
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn test_keying_is_case_insensitive() {
        let manager = EphemeralKeyManager::in_memory();
        let lower = manager.get_or_create("0xabc123");
        let upper = manager.get_or_create("0xABC123");
        assert_eq!(lower.address(), upper.address());
    }

    #[test]
    fn test_corrupt_entry_is_replaced() {
        let store = Arc::new(MemoryKeyStore::new());
        assert!(store.store("app-1", "not a private key"));

        let manager = EphemeralKeyManager::new(store.clone());
        let key = manager.get_or_create("app-1");

        // The corrupt value was replaced with the new key's secret
        assert_eq!(store.load("app-1").as_deref(), Some(&**key.secret_hex()));
    }

    #[test]
    fn test_fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = EphemeralKeyManager::persistent(dir.path());

        let first = manager.get_or_create("0xapp");

        // A second manager over the same directory sees the same key
        let manager2 = EphemeralKeyManager::persistent(dir.path());
        let second = manager2.get_or_create("0xapp");
        assert_eq!(first.address(), second.address());
    }

    #[cfg(unix)]
    #[test]
    fn test_fs_store_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyStore::new(dir.path());
        assert!(store.store("0xapp", "0xdeadbeef"));

        let path = dir.path().join("0xapp.key");
        let perms = std::fs::metadata(&path).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_fs_store_refuses_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyStore::new(dir.path());
        assert!(store.store("real", "0xcafe"));

        std::os::unix::fs::symlink(
            dir.path().join("real.key"),
            dir.path().join("linked.key"),
        )
        .unwrap();

        assert_eq!(store.load("linked"), None);
    }

    #[test]
    fn test_unavailable_fs_store_degrades() {
        // A path that cannot be created (under a file, not a directory)
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let manager = EphemeralKeyManager::persistent(blocker.join("keys"));

        // No error: the key is just session-scoped
        let first = manager.get_or_create("app-1");
        let second = manager.get_or_create("app-1");
        assert_ne!(first.address(), second.address());
    }
}
