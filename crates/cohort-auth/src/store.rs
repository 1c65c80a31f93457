//! Credential persistence.
//!
//! [`TokenStore`] is the single source of truth for the current credential
//! pair. Durable persistence is delegated to an opaque [`CredentialStorage`]
//! backing so embedders can keep credentials wherever they already keep
//! state; the store itself only caches in memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::credential::{Credential, now_ms};
use crate::error::{AuthError, Result};

/// Default credential file name within the cohort data directory.
pub const CREDENTIAL_FILE: &str = "session-credential.json";

/// Lead time before expiry that triggers a proactive refresh (60 seconds).
pub const DEFAULT_REFRESH_LEAD_MS: u64 = 60 * 1000;

/// Default data directory for persisted credentials.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("cohort"))
}

// ============================================================================
// CredentialStorage
// ============================================================================

/// Opaque durable backing for the token store.
#[async_trait]
pub trait CredentialStorage: Send + Sync + std::fmt::Debug {
    /// Load the persisted credential, if any.
    async fn load(&self) -> Result<Option<Credential>>;

    /// Persist the credential, replacing any previous one.
    async fn save(&self, credential: &Credential) -> Result<()>;

    /// Remove any persisted credential. Must be idempotent.
    async fn remove(&self) -> Result<()>;
}

/// JSON-file backing store for production use.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a file store under the given data directory.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(CREDENTIAL_FILE),
        }
    }

    /// Create with an explicit file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// The credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStorage for FileStorage {
    async fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AuthError::Storage(format!("Failed to read credential file: {}", e)))?;

        let credential: Credential = serde_json::from_str(&content).map_err(|e| {
            AuthError::Serialization(format!("Failed to parse credential file: {}", e))
        })?;

        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuthError::Storage(format!("Failed to create credential directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(credential).map_err(|e| {
            AuthError::Serialization(format!("Failed to serialize credential: {}", e))
        })?;

        std::fs::write(&self.path, json)
            .map_err(|e| AuthError::Storage(format!("Failed to write credential file: {}", e)))?;

        tracing::debug!("Credential saved to {}", self.path.display());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                AuthError::Storage(format!("Failed to delete credential file: {}", e))
            })?;
        }
        Ok(())
    }
}

/// In-memory backing store for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: RwLock<Option<Credential>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        let mut slot = self.slot.write().await;
        *slot = Some(credential.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        let mut slot = self.slot.write().await;
        *slot = None;
        Ok(())
    }
}

// ============================================================================
// TokenStore
// ============================================================================

/// Single source of truth for the current credential pair.
#[derive(Debug, Clone)]
pub struct TokenStore {
    cached: Arc<RwLock<Option<Credential>>>,
    storage: Arc<dyn CredentialStorage>,
    refresh_lead_ms: u64,
}

impl TokenStore {
    /// Create a store over the given backing storage.
    pub fn new(storage: Arc<dyn CredentialStorage>) -> Self {
        Self {
            cached: Arc::new(RwLock::new(None)),
            storage,
            refresh_lead_ms: DEFAULT_REFRESH_LEAD_MS,
        }
    }

    /// Store backed by a JSON file under `data_dir`.
    pub fn on_disk(data_dir: &Path) -> Self {
        Self::new(Arc::new(FileStorage::new(data_dir)))
    }

    /// Store with no durable backing.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Override the proactive-refresh lead window.
    pub fn with_refresh_lead(mut self, lead_ms: u64) -> Self {
        self.refresh_lead_ms = lead_ms;
        self
    }

    /// Current credential, loading from backing storage on first access.
    pub async fn get(&self) -> Result<Option<Credential>> {
        {
            let cache = self.cached.read().await;
            if cache.is_some() {
                return Ok(cache.clone());
            }
        }

        let loaded = self.storage.load().await?;
        if loaded.is_some() {
            let mut cache = self.cached.write().await;
            *cache = loaded.clone();
        }
        Ok(loaded)
    }

    /// Replace the stored credential. Overwrite is total.
    pub async fn set(&self, credential: Credential) -> Result<()> {
        self.storage.save(&credential).await?;
        let mut cache = self.cached.write().await;
        *cache = Some(credential);
        Ok(())
    }

    /// Remove all credential material. Safe to call repeatedly.
    pub async fn clear(&self) -> Result<()> {
        self.storage.remove().await?;
        let mut cache = self.cached.write().await;
        *cache = None;
        Ok(())
    }

    /// Whether the credential is expired or inside the proactive-refresh
    /// lead window.
    pub fn needs_refresh(&self, credential: &Credential) -> bool {
        credential.expires_within(now_ms(), self.refresh_lead_ms)
    }

    /// Whether the credential is past its expiry.
    pub fn is_expired(&self, credential: &Credential) -> bool {
        credential.is_expired(now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn credential(access: &str) -> Credential {
        Credential::new(access, "refresh", 3600)
    }

    #[tokio::test]
    async fn test_file_save_and_load() {
        let temp = tempdir().unwrap();
        let store = TokenStore::on_disk(temp.path());

        store.set(credential("access-1")).await.unwrap();

        // A fresh store over the same directory sees the persisted value.
        let reloaded = TokenStore::on_disk(temp.path());
        let loaded = reloaded.get().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "access-1");
        assert_eq!(loaded.refresh_token, "refresh");
    }

    #[tokio::test]
    async fn test_set_is_total_overwrite() {
        let store = TokenStore::in_memory();
        store.set(credential("first")).await.unwrap();
        store.set(credential("second")).await.unwrap();

        let current = store.get().await.unwrap().unwrap();
        assert_eq!(current.access_token, "second");
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let temp = tempdir().unwrap();
        let store = TokenStore::on_disk(temp.path());

        store.set(credential("access-1")).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_on_empty_store() {
        let store = TokenStore::in_memory();
        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_needs_refresh_inside_lead_window() {
        let store = TokenStore::in_memory().with_refresh_lead(60 * 1000);

        let fresh = credential("a");
        assert!(!store.needs_refresh(&fresh));

        let expiring = Credential {
            expires_at: now_ms() + 30 * 1000,
            ..fresh.clone()
        };
        assert!(store.needs_refresh(&expiring));
        assert!(!store.is_expired(&expiring));

        let expired = Credential {
            expires_at: now_ms().saturating_sub(1000),
            ..fresh
        };
        assert!(store.needs_refresh(&expired));
        assert!(store.is_expired(&expired));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(CREDENTIAL_FILE);
        std::fs::write(&path, "not json").unwrap();

        let store = TokenStore::on_disk(temp.path());
        assert!(store.get().await.is_err());
    }
}
