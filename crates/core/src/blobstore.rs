//! Durable id -> bytes mapping for original uploads.

use crate::error::StorageError;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Mutex;
use storage::blobs;
use tracing::debug;

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, id: &str, bytes: &[u8]) -> Result<(), StorageError>;
    /// `Ok(None)` when nothing is stored under `id`.
    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>, StorageError>;
    /// Removing an unknown id succeeds.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;
    async fn clear(&self) -> Result<(), StorageError>;
    async fn total_size(&self) -> Result<u64, StorageError>;
    async fn ids(&self) -> Result<Vec<String>, StorageError>;
}

fn check_quota(
    quota: Option<u64>,
    current_total: u64,
    replaced: u64,
    incoming: u64,
) -> Result<(), StorageError> {
    if let Some(limit) = quota {
        let after = current_total.saturating_sub(replaced) + incoming;
        if after > limit {
            return Err(StorageError::StorageFull {
                requested: incoming,
                available: limit.saturating_sub(current_total.saturating_sub(replaced)),
            });
        }
    }
    Ok(())
}

/// Blob store persisted in the `media_blobs` SQLite table.
pub struct SqliteBlobStore {
    pool: SqlitePool,
    quota: Option<u64>,
}

impl SqliteBlobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, quota: None }
    }

    pub fn with_quota(mut self, max_bytes: Option<u64>) -> Self {
        self.quota = max_bytes;
        self
    }
}

#[async_trait::async_trait]
impl BlobStore for SqliteBlobStore {
    async fn put(&self, id: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.quota.is_some() {
            let total = blobs::total_size(&self.pool).await?.max(0) as u64;
            let replaced = blobs::blob_size(&self.pool, id).await?.unwrap_or(0).max(0) as u64;
            check_quota(self.quota, total, replaced, bytes.len() as u64)?;
        }
        blobs::put_blob(&self.pool, id, bytes).await?;
        debug!(id, bytes = bytes.len(), "blob stored");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(blobs::get_blob(&self.pool, id).await?)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let removed = blobs::delete_blob(&self.pool, id).await?;
        debug!(id, removed, "blob delete");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        blobs::clear_blobs(&self.pool).await?;
        Ok(())
    }

    async fn total_size(&self) -> Result<u64, StorageError> {
        Ok(blobs::total_size(&self.pool).await?.max(0) as u64)
    }

    async fn ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(blobs::list_blob_ids(&self.pool).await?)
    }
}

/// Process-local blob store; contents do not survive restarts.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    quota: Option<u64>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(mut self, max_bytes: Option<u64>) -> Self {
        self.quota = max_bytes;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, StorageError> {
        self.blobs
            .lock()
            .map_err(|_| StorageError::StorageUnavailable("blob map poisoned".into()))
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, id: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut map = self.lock()?;
        let total: u64 = map.values().map(|b| b.len() as u64).sum();
        let replaced = map.get(id).map(|b| b.len() as u64).unwrap_or(0);
        check_quota(self.quota, total, replaced, bytes.len() as u64)?;
        map.insert(id.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.lock()?.remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.lock()?.clear();
        Ok(())
    }

    async fn total_size(&self) -> Result<u64, StorageError> {
        Ok(self.lock()?.values().map(|b| b.len() as u64).sum())
    }

    async fn ids(&self) -> Result<Vec<String>, StorageError> {
        let mut ids: Vec<String> = self.lock()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_reports_absent_not_error() {
        let store = MemoryBlobStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        store.delete("nope").await.unwrap();
    }

    #[tokio::test]
    async fn quota_rejects_oversized_put_and_allows_replacement() {
        let store = MemoryBlobStore::new().with_quota(Some(10));
        store.put("a", &[0; 8]).await.unwrap();
        let err = store.put("b", &[0; 3]).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::StorageFull {
                requested: 3,
                available: 2
            }
        ));
        // Replacing "a" frees its old size first.
        store.put("a", &[0; 10]).await.unwrap();
        assert_eq!(store.total_size().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn sqlite_store_round_trip_with_quota() {
        let temp = tempfile::tempdir().unwrap();
        let pool = storage::connect(&temp.path().join("b.db").to_string_lossy())
            .await
            .unwrap();
        storage::migrate(&pool).await.unwrap();
        let store = SqliteBlobStore::new(pool).with_quota(Some(6));

        store.put("x", b"abcd").await.unwrap();
        assert_eq!(store.get("x").await.unwrap().unwrap(), b"abcd");
        assert!(matches!(
            store.put("y", b"abc").await,
            Err(StorageError::StorageFull { .. })
        ));
        assert!(store.get("y").await.unwrap().is_none());
        assert_eq!(store.ids().await.unwrap(), vec!["x".to_string()]);
        store.clear().await.unwrap();
        assert_eq!(store.total_size().await.unwrap(), 0);
    }
}
