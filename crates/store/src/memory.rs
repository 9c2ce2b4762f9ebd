//! In-memory transient store implementation using DashMap.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use planview_core::{
    traits::{Prunable, TransientStore},
    types::{StoredRef, TempHandle},
    Error, Result,
};

use crate::{check_handle, secure_filename, stored_name_for, temp_name_for};

/// Stored image with its creation time.
#[derive(Debug, Clone)]
struct StoredImage {
    data: Bytes,
    created_at: Instant,
}

/// In-memory transient store using DashMap for concurrent access.
///
/// Suitable for tests and single-process deployments that do not need the
/// images to survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryTransientStore {
    data: DashMap<String, StoredImage>,
}

impl InMemoryTransientStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether an entry exists under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }
}

#[async_trait]
impl TransientStore for InMemoryTransientStore {
    async fn store(&self, name: &str, bytes: Bytes) -> Result<StoredRef> {
        let sanitized = secure_filename(name);
        if sanitized.is_empty() {
            return Err(Error::invalid_request("Invalid filename"));
        }
        if bytes.is_empty() {
            return Err(Error::storage("Failed to save file or file is empty"));
        }
        let name = stored_name_for(&sanitized);

        let size = bytes.len() as u64;
        self.data.insert(
            name.clone(),
            StoredImage {
                data: bytes,
                created_at: Instant::now(),
            },
        );
        Ok(StoredRef { name, size })
    }

    async fn duplicate(&self, stored: &StoredRef) -> Result<TempHandle> {
        let data = self
            .data
            .get(&stored.name)
            .map(|entry| entry.data.clone())
            .ok_or_else(|| Error::not_found(stored.name.clone()))?;

        let handle = temp_name_for(&stored.name);
        self.data.insert(
            handle.as_str().to_string(),
            StoredImage {
                data,
                created_at: Instant::now(),
            },
        );
        Ok(handle)
    }

    async fn resolve(&self, handle: &TempHandle) -> Result<Bytes> {
        check_handle(handle)?;
        self.data
            .get(handle.as_str())
            .map(|entry| entry.data.clone())
            .ok_or_else(|| Error::not_found(handle.as_str()))
    }

    async fn delete(&self, name: &str) -> bool {
        self.data.remove(name).is_some()
    }
}

#[async_trait]
impl Prunable for InMemoryTransientStore {
    async fn prune(&self, max_age: Duration) -> Result<usize> {
        let before = self.data.len();
        self.data.retain(|name, image| {
            !(name.starts_with(TempHandle::PREFIX) && image.created_at.elapsed() >= max_age)
        });
        Ok(before - self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_is_byte_identical() {
        let store = InMemoryTransientStore::new();
        let data = Bytes::from(vec![7u8; 4096]);

        let stored = store.store("plan.webp", data.clone()).await.unwrap();
        let handle = store.duplicate(&stored).await.unwrap();

        assert_eq!(store.resolve(&handle).await.unwrap(), data);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_bytes_are_a_storage_error() {
        let store = InMemoryTransientStore::new();
        let err = store.store("plan.png", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_handle_is_not_found() {
        let store = InMemoryTransientStore::new();
        let stored = store.store("a.png", Bytes::from_static(b"x")).await.unwrap();
        let handle = store.duplicate(&stored).await.unwrap();

        assert!(store.delete(handle.as_str()).await);
        assert!(matches!(
            store.resolve(&handle).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_prune_only_touches_temp_entries() {
        let store = InMemoryTransientStore::new();
        let stored = store.store("a.png", Bytes::from_static(b"x")).await.unwrap();
        store.duplicate(&stored).await.unwrap();

        assert_eq!(store.prune(Duration::ZERO).await.unwrap(), 1);
        assert!(store.contains(&stored.name));
    }

    #[tokio::test]
    async fn test_same_filename_uploads_stay_separate() {
        let store = InMemoryTransientStore::new();
        let a = store.store("plan.png", Bytes::from_static(b"AAAA-user-a")).await.unwrap();
        let b = store.store("plan.png", Bytes::from_static(b"BBBB-user-b")).await.unwrap();
        assert_ne!(a.name, b.name);

        let handle_a = store.duplicate(&a).await.unwrap();
        assert!(store.delete(&a.name).await);
        let handle_b = store.duplicate(&b).await.unwrap();

        assert_eq!(store.resolve(&handle_a).await.unwrap(), Bytes::from_static(b"AAAA-user-a"));
        assert_eq!(store.resolve(&handle_b).await.unwrap(), Bytes::from_static(b"BBBB-user-b"));
    }
}
