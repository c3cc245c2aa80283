// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local persistent key-value storage and the session slot kept in it.
//!
//! Provides:
//! - `FileStore`: JSON map file under the platform data directory
//! - `MemoryStore`: in-process store for tests and offline mode
//! - `SessionCache`: typed access to the cached session entry

use crate::error::{AppError, Result};
use crate::models::Session;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Storage key of the cached session.
pub const SESSION_CACHE_KEY: &str = "supabase.auth.token";

const STORE_FILE_NAME: &str = "storage.json";

/// Asynchronous string key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed store. The whole map is rewritten on every change.
pub struct FileStore {
    entries: RwLock<HashMap<String, String>>,
    file_path: PathBuf,
}

impl FileStore {
    /// Open the store at the default platform location.
    pub async fn open_default() -> Result<Self> {
        let data_dir = directories::ProjectDirs::from("app", "qrush", "qrush")
            .ok_or_else(|| AppError::Cache("Could not determine data directory".to_string()))?
            .data_dir()
            .to_path_buf();

        Self::open(data_dir.join(STORE_FILE_NAME)).await
    }

    /// Open the store at `file_path`, loading existing entries if present.
    pub async fn open(file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();

        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Cache(format!("Failed to create data dir: {}", e)))?;
        }

        let entries = match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to parse storage file, starting fresh");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(AppError::Cache(format!("Failed to read storage: {}", e)));
            }
        };

        Ok(Self {
            entries: RwLock::new(entries),
            file_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::Cache(format!("Failed to serialize storage: {}", e)))?;

        // Replace the file atomically.
        let temp_path = self.file_path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to create temp file: {}", e)))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| AppError::Cache(format!("Failed to write storage: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| AppError::Cache(format!("Failed to sync storage: {}", e)))?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.file_path)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to replace storage: {}", e)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// What the cache currently holds for the session slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedSession {
    Missing,
    /// An entry exists but does not parse into a usable session.
    Invalid,
    Valid(Session),
}

/// Typed access to the session entry of a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionCache {
    store: std::sync::Arc<dyn KeyValueStore>,
}

impl SessionCache {
    pub fn new(store: std::sync::Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read and check the cached session.
    pub async fn read(&self) -> Result<CachedSession> {
        let Some(raw) = self.store.get(SESSION_CACHE_KEY).await? else {
            return Ok(CachedSession::Missing);
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if session.is_valid() => Ok(CachedSession::Valid(session)),
            Ok(_) => Ok(CachedSession::Invalid),
            Err(e) => {
                tracing::debug!(error = %e, "Cached session does not parse");
                Ok(CachedSession::Invalid)
            }
        }
    }

    /// Overwrite the cached session.
    pub async fn write(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)
            .map_err(|e| AppError::Cache(format!("Failed to serialize session: {}", e)))?;
        self.store.set(SESSION_CACHE_KEY, raw).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(SESSION_CACHE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionUser;
    use std::sync::Arc;

    fn session() -> Session {
        Session {
            user: SessionUser {
                id: "user-1".to_string(),
                email: "a@example.com".to_string(),
            },
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_session_cache_roundtrip_and_clear() {
        let store = Arc::new(MemoryStore::new());
        let cache = SessionCache::new(store.clone());

        assert_eq!(cache.read().await.unwrap(), CachedSession::Missing);

        cache.write(&session()).await.unwrap();
        assert_eq!(
            cache.read().await.unwrap(),
            CachedSession::Valid(session())
        );

        cache.clear().await.unwrap();
        assert_eq!(cache.read().await.unwrap(), CachedSession::Missing);
        assert!(store.get(SESSION_CACHE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_cache_invalid_entries() {
        let store = Arc::new(MemoryStore::new());
        let cache = SessionCache::new(store.clone());

        store
            .set(SESSION_CACHE_KEY, "not json".to_string())
            .await
            .unwrap();
        assert_eq!(cache.read().await.unwrap(), CachedSession::Invalid);

        store
            .set(
                SESSION_CACHE_KEY,
                r#"{"user":{"id":"u"},"refreshToken":"r"}"#.to_string(),
            )
            .await
            .unwrap();
        assert_eq!(cache.read().await.unwrap(), CachedSession::Invalid);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(STORE_FILE_NAME);

        let store = FileStore::open(&path).await.unwrap();
        store.set("a", "1".to_string()).await.unwrap();
        store.set("b", "2".to_string()).await.unwrap();
        store.remove("b").await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("a").await.unwrap().as_deref(), Some("1"));
        assert!(reopened.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_interrupted_write_keeps_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        let temp_path = path.with_extension("json.tmp");

        let store = FileStore::open(&path).await.unwrap();
        store.set("a", "1".to_string()).await.unwrap();
        assert!(!temp_path.exists());

        // A write that died halfway only ever touched the temp file.
        std::fs::write(&temp_path, "{ \"a\": \"tru").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("a").await.unwrap().as_deref(), Some("1"));

        reopened.set("b", "2".to_string()).await.unwrap();
        assert!(!temp_path.exists());
        let on_disk: HashMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 2);
    }

    #[tokio::test]
    async fn test_file_store_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        std::fs::write(&path, "{ broken").unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert!(store.get("anything").await.unwrap().is_none());
    }
}
