//! Transient Store traits.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::Result;
use crate::types::{StoredRef, TempHandle};

/// Working storage for uploaded images and their temp copies.
#[async_trait]
pub trait TransientStore: Send + Sync {
    /// Sanitize `name` and write `bytes` under it.
    ///
    /// Fails with a storage error when nothing was written or the target
    /// cannot be read back.
    async fn store(&self, name: &str, bytes: Bytes) -> Result<StoredRef>;

    /// Copy a stored image under a derived `temp_` name.
    async fn duplicate(&self, stored: &StoredRef) -> Result<TempHandle>;

    /// Load the bytes behind a temp handle.
    async fn resolve(&self, handle: &TempHandle) -> Result<Bytes>;

    /// Best-effort removal of a stored name or temp handle.
    ///
    /// Never fails; returns whether something was removed.
    async fn delete(&self, name: &str) -> bool;
}

/// Stores that can expire abandoned entries.
#[async_trait]
pub trait Prunable: Send + Sync {
    /// Remove temp copies older than `max_age`.
    /// Returns the number of entries removed.
    async fn prune(&self, max_age: Duration) -> Result<usize>;
}
