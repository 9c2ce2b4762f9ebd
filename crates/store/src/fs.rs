//! Filesystem-backed transient store.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use planview_core::{
    traits::{Prunable, TransientStore},
    types::{StoredRef, TempHandle},
    Error, Result,
};

use crate::{check_handle, is_safe_name, secure_filename, stored_name_for, temp_name_for};

/// Transient store writing into a single working directory.
///
/// Writes go to a hidden `.part` file first and are renamed into place, so
/// a concurrent reader never observes a half-written image.
#[derive(Debug, Clone)]
pub struct FsTransientStore {
    root: PathBuf,
}

impl FsTransientStore {
    /// Open (creating if needed) the working directory at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            Error::storage(format!(
                "Failed to create upload folder {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    /// The working directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    async fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let partial = self.path_of(&format!(".{}.{}.part", name, &token[..8]));
        let target = self.path_of(name);

        if let Err(e) = tokio::fs::write(&partial, bytes).await {
            remove_quietly(&partial).await;
            return Err(Error::storage(format!("Failed to save file: {}", e)));
        }
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            remove_quietly(&partial).await;
            return Err(Error::storage(format!("Failed to save file: {}", e)));
        }
        Ok(())
    }

    /// Confirm `name` exists, is non-empty, and can be opened.
    async fn verify(&self, name: &str) -> Result<u64> {
        let path = self.path_of(name);
        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                return Err(Error::storage(format!(
                    "Failed to save file or file is empty: {}",
                    e
                )))
            }
        };
        if size == 0 {
            return Err(Error::storage("Failed to save file or file is empty"));
        }
        tokio::fs::File::open(&path)
            .await
            .map_err(|e| Error::storage(format!("Stored file is unreadable: {}", e)))?;
        Ok(size)
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial file");
        }
    }
}

#[async_trait]
impl TransientStore for FsTransientStore {
    async fn store(&self, name: &str, bytes: Bytes) -> Result<StoredRef> {
        let sanitized = secure_filename(name);
        if sanitized.is_empty() {
            return Err(Error::invalid_request("Invalid filename"));
        }
        let name = stored_name_for(&sanitized);

        self.write_atomic(&name, &bytes).await?;
        match self.verify(&name).await {
            Ok(size) => {
                tracing::debug!(name = %name, size, "Image stored");
                Ok(StoredRef { name, size })
            }
            Err(e) => {
                self.delete(&name).await;
                Err(e)
            }
        }
    }

    async fn duplicate(&self, stored: &StoredRef) -> Result<TempHandle> {
        let handle = temp_name_for(&stored.name);
        let source = self.path_of(&stored.name);
        let bytes = match tokio::fs::read(&source).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found(stored.name.clone()))
            }
            Err(e) => return Err(Error::storage(format!("Failed to read stored file: {}", e))),
        };

        self.write_atomic(handle.as_str(), &bytes).await?;
        tracing::debug!(source = %stored.name, handle = %handle, "Temp copy created");
        Ok(handle)
    }

    async fn resolve(&self, handle: &TempHandle) -> Result<Bytes> {
        check_handle(handle)?;
        match tokio::fs::read(self.path_of(handle.as_str())).await {
            Ok(bytes) if bytes.is_empty() => Err(Error::storage(format!(
                "Stored image {} is empty",
                handle
            ))),
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::not_found(handle.as_str())),
            Err(e) => Err(Error::storage(format!("Failed to read {}: {}", handle, e))),
        }
    }

    async fn delete(&self, name: &str) -> bool {
        if !is_safe_name(name) {
            tracing::warn!(name = %name, "Refusing to delete unsafe name");
            return false;
        }
        match tokio::fs::remove_file(self.path_of(name)).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "Failed to delete stored file");
                false
            }
        }
    }
}

#[async_trait]
impl Prunable for FsTransientStore {
    async fn prune(&self, max_age: Duration) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| Error::storage(format!("Failed to list upload folder: {}", e)))?;
        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::storage(format!("Failed to list upload folder: {}", e)))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(TempHandle::PREFIX) {
                continue;
            }
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "Skipping entry without mtime");
                    continue;
                }
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age >= max_age && self.delete(&name).await {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Pruned expired temp copies");
        }
        Ok(removed)
    }
}
