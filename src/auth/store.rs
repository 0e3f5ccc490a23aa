//! Credential storage
//!
//! A [`CredentialStore`] is a durable key to secret mapping. [`CredentialVault`]
//! layers [`Credential`] persistence on top of any store, writing the access
//! token under the bare platform key and the remaining fields under derived keys.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::types::{Credential, Platform};

/// Errors that can occur during credential store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error during storage operations
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store lock was poisoned by a panicking writer
    #[error("Credential store lock poisoned")]
    Poisoned,

    /// Persisted value could not be interpreted
    #[error("Corrupt value for key {key}: {reason}")]
    Corrupt {
        /// Key holding the bad value
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// OS secret store failure
    #[error("Secret store error: {0}")]
    Backend(String),
}

/// Durable key to secret mapping
///
/// Implementations must make a single-key `save` atomic with respect to
/// concurrent `load`s of the same key.
pub trait CredentialStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Load the value under `key`, if any
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).save(key, value)
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store, mainly for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.entries.read().map_err(|_| StoreError::Poisoned)?.clone())
    }
}

impl CredentialStore for MemoryStore {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(key)
            .cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .remove(key);
        Ok(())
    }
}

// ============================================================================
// File store
// ============================================================================

/// JSON file store with user-only permissions
///
/// All keys live in one JSON object. Writes go to a sibling temp file which is
/// then renamed over the original, so readers never observe a partial file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore {
    /// Create a store at the default path (platform-specific config directory)
    #[must_use]
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("social-linkup");
        Self::with_path(config_dir.join("credentials.store.json"))
    }

    /// Create a store with a custom path
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            lock: RwLock::new(()),
        }
    }

    /// Get the storage path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.read().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_map()?.remove(key))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// ============================================================================
// OS keyring store
// ============================================================================

/// Store backed by the OS secret service (Keychain, Credential Manager, Secret Service)
#[cfg(feature = "keyring")]
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

#[cfg(feature = "keyring")]
impl KeyringStore {
    /// Create a store whose entries live under `service`
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(&self.service, key).map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[cfg(feature = "keyring")]
impl CredentialStore for KeyringStore {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }
}

// ============================================================================
// Credential vault
// ============================================================================

const REFRESH_TOKEN_SUFFIX: &str = "refresh_token";
const EXPIRES_AT_SUFFIX: &str = "expires_at";
const USERNAME_SUFFIX: &str = "username";
const USER_ID_SUFFIX: &str = "user_id";

fn field_key(platform: Platform, suffix: &str) -> String {
    format!("{}.{suffix}", platform.key())
}

/// Every key a platform's credential occupies, bare token key last
fn keys(platform: Platform) -> [String; 5] {
    [
        field_key(platform, REFRESH_TOKEN_SUFFIX),
        field_key(platform, EXPIRES_AT_SUFFIX),
        field_key(platform, USERNAME_SUFFIX),
        field_key(platform, USER_ID_SUFFIX),
        platform.key().to_string(),
    ]
}

/// Persists one [`Credential`] per platform on top of a [`CredentialStore`]
#[derive(Clone)]
pub struct CredentialVault {
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

impl CredentialVault {
    /// Wrap a store
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// The underlying store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Persist a credential, replacing the platform's previous one
    ///
    /// The access token is written last. If any write fails the platform's
    /// previous keys are put back, so a failed save leaves the old credential
    /// loadable.
    pub fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        let expires_at = credential.expires_at.map(|t| t.to_string());
        self.replace(
            credential.platform,
            [
                credential.refresh_token.as_deref(),
                expires_at.as_deref(),
                credential.username.as_deref(),
                credential.user_id.as_deref(),
                Some(credential.access_token.as_str()),
            ],
        )
    }

    /// Load the platform's credential, if one was saved
    pub fn load(&self, platform: Platform) -> Result<Option<Credential>, StoreError> {
        let Some(access_token) = self.store.load(platform.key())? else {
            return Ok(None);
        };

        let expires_at = match self.store.load(&field_key(platform, EXPIRES_AT_SUFFIX))? {
            Some(raw) => Some(raw.parse::<u64>().map_err(|e| StoreError::Corrupt {
                key: field_key(platform, EXPIRES_AT_SUFFIX),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Some(Credential {
            platform,
            access_token,
            refresh_token: self.store.load(&field_key(platform, REFRESH_TOKEN_SUFFIX))?,
            expires_at,
            username: self.store.load(&field_key(platform, USERNAME_SUFFIX))?,
            user_id: self.store.load(&field_key(platform, USER_ID_SUFFIX))?,
        }))
    }

    /// Remove every key belonging to the platform
    ///
    /// Like [`save`](Self::save), a failure restores what was removed.
    pub fn delete(&self, platform: Platform) -> Result<(), StoreError> {
        self.replace(platform, [None; 5])
    }

    /// Write `values` in [`keys`] order, undoing every write if one fails
    fn replace(&self, platform: Platform, values: [Option<&str>; 5]) -> Result<(), StoreError> {
        let keys = keys(platform);
        let previous = keys
            .iter()
            .map(|key| self.store.load(key))
            .collect::<Result<Vec<_>, _>>()?;

        for (key, value) in keys.iter().zip(values) {
            if let Err(e) = self.put(key, value) {
                tracing::warn!(%platform, key = %key, "Credential write failed, restoring previous values: {e}");
                for (key, old) in keys.iter().zip(&previous) {
                    if let Err(e) = self.put(key, old.as_deref()) {
                        tracing::warn!(%platform, key = %key, "Could not restore credential field: {e}");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn put(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        match value {
            Some(v) => self.store.save(key, v),
            None => self.store.delete(key),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::RwLock;

    use super::{CredentialStore, MemoryStore, StoreError};

    /// Memory store that refuses writes and deletes of chosen keys
    #[derive(Default)]
    pub(crate) struct FailingStore {
        pub(crate) inner: MemoryStore,
        refused: RwLock<HashSet<String>>,
    }

    impl FailingStore {
        pub(crate) fn refuse(&self, key: &str) {
            self.refused.write().unwrap().insert(key.to_string());
        }

        fn check(&self, key: &str) -> Result<(), StoreError> {
            if self.refused.read().unwrap().contains(key) {
                return Err(StoreError::Backend(format!("write to {key} refused")));
            }
            Ok(())
        }
    }

    impl CredentialStore for FailingStore {
        fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.check(key)?;
            self.inner.save(key, value)
        }

        fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.load(key)
        }

        fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.check(key)?;
            self.inner.delete(key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FailingStore;
    use super::*;
    use tempfile::TempDir;

    fn sample_credential() -> Credential {
        Credential {
            platform: Platform::Twitter,
            access_token: "tok1".to_string(),
            refresh_token: Some("ref1".to_string()),
            expires_at: Some(4_102_444_800),
            username: Some("jack".to_string()),
            user_id: Some("42".to_string()),
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.load("k").unwrap(), None);
        store.save("k", "v1").unwrap();
        store.save("k", "v2").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("v2"));
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.load("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        FileStore::with_path(path.clone()).save("linkedin", "abc").unwrap();

        let reopened = FileStore::with_path(path);
        assert_eq!(reopened.load("linkedin").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.load("twitter").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().join("store.json"));
        store.save("k", "v").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_delete_missing_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().join("store.json"));
        store.delete("nothing").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_vault_writes_token_under_platform_key() {
        let store = Arc::new(MemoryStore::new());
        let vault = CredentialVault::new(store.clone());
        vault.save(&sample_credential()).unwrap();

        assert_eq!(store.load("twitter").unwrap().as_deref(), Some("tok1"));
        assert_eq!(store.load("twitter.username").unwrap().as_deref(), Some("jack"));
    }

    #[test]
    fn test_vault_roundtrip_and_delete() {
        let vault = CredentialVault::new(Arc::new(MemoryStore::new()));
        let cred = sample_credential();
        vault.save(&cred).unwrap();
        assert_eq!(vault.load(Platform::Twitter).unwrap(), Some(cred));
        assert_eq!(vault.load(Platform::LinkedIn).unwrap(), None);

        vault.delete(Platform::Twitter).unwrap();
        assert_eq!(vault.load(Platform::Twitter).unwrap(), None);
    }

    #[test]
    fn test_vault_clears_stale_optional_fields() {
        let store = Arc::new(MemoryStore::new());
        let vault = CredentialVault::new(store.clone());
        vault.save(&sample_credential()).unwrap();

        let bare = Credential::new(Platform::Twitter, "tok2");
        vault.save(&bare).unwrap();

        assert_eq!(vault.load(Platform::Twitter).unwrap(), Some(bare));
        assert_eq!(store.load("twitter.refresh_token").unwrap(), None);
    }

    #[test]
    fn test_vault_rejects_corrupt_expiry() {
        let store = Arc::new(MemoryStore::new());
        store.save("linkedin", "tok").unwrap();
        store.save("linkedin.expires_at", "soon").unwrap();

        let vault = CredentialVault::new(store);
        assert!(matches!(
            vault.load(Platform::LinkedIn),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_failed_save_keeps_previous_credential() {
        let store = Arc::new(FailingStore::default());
        let vault = CredentialVault::new(store.clone());
        let old = sample_credential();
        vault.save(&old).unwrap();

        store.refuse("twitter.refresh_token");
        let new = Credential {
            access_token: "tok2".to_string(),
            refresh_token: Some("ref2".to_string()),
            username: None,
            ..sample_credential()
        };
        assert!(matches!(vault.save(&new), Err(StoreError::Backend(_))));
        assert_eq!(vault.load(Platform::Twitter).unwrap(), Some(old));
    }

    #[test]
    fn test_failed_token_write_restores_fields() {
        let store = Arc::new(FailingStore::default());
        let vault = CredentialVault::new(store.clone());
        let old = sample_credential();
        vault.save(&old).unwrap();

        store.refuse("twitter");
        let new = Credential {
            access_token: "tok2".to_string(),
            username: Some("other".to_string()),
            user_id: None,
            ..sample_credential()
        };
        assert!(vault.save(&new).is_err());
        assert_eq!(vault.load(Platform::Twitter).unwrap(), Some(old));
    }

    #[test]
    fn test_failed_delete_keeps_credential() {
        let store = Arc::new(FailingStore::default());
        let vault = CredentialVault::new(store.clone());
        let old = sample_credential();
        vault.save(&old).unwrap();

        store.refuse("twitter.user_id");
        assert!(vault.delete(Platform::Twitter).is_err());
        assert_eq!(vault.load(Platform::Twitter).unwrap(), Some(old));
        assert_eq!(store.inner.load("twitter.refresh_token").unwrap().as_deref(), Some("ref1"));
    }
}
