//! Local filesystem implementation of the BodyStore trait

use crate::cache::{BodyStore, CacheError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Local filesystem-backed implementation of BodyStore
///
/// Bodies live under one directory tree per cache namespace, so purging a
/// stale namespace is a single recursive delete.
#[derive(Clone)]
pub struct LocalBodyStore {
    base_path: PathBuf,
}

impl LocalBodyStore {
    /// Create a new local body store
    ///
    /// The base_path will be created if it doesn't exist.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, CacheError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        info!("Initialized LocalBodyStore at {:?}", base_path);
        Ok(Self { base_path })
    }

    /// Get the filesystem path for a hash within a namespace
    ///
    /// Uses a nested directory structure: {ns}/{hash[0:2]}/{hash[2:4]}/{hash[4:]}
    fn body_path(&self, namespace: &str, hash: &str) -> PathBuf {
        let ns_root = self.base_path.join(namespace);
        if hash.len() < 4 {
            // Fallback for short hashes
            return ns_root.join(hash);
        }

        let dir1 = &hash[0..2];
        let dir2 = &hash[2..4];
        let filename = &hash[4..];

        ns_root.join(dir1).join(dir2).join(filename)
    }

    /// Store data atomically using a temporary file
    fn put_atomic(&self, namespace: &str, hash: &str, data: &[u8]) -> Result<(), CacheError> {
        let final_path = self.body_path(namespace, hash);

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a temporary file first, then rename into place
        let temp_path = final_path.with_extension("tmp");
        fs::write(&temp_path, data)?;
        fs::rename(&temp_path, &final_path)?;

        debug!("Stored body {} at {:?}", hash, final_path);
        Ok(())
    }
}

#[async_trait::async_trait]
impl BodyStore for LocalBodyStore {
    async fn put(&self, namespace: &str, hash: &str, data: &[u8]) -> Result<(), CacheError> {
        // Use tokio::task::spawn_blocking for filesystem I/O
        let store = self.clone();
        let namespace = namespace.to_string();
        let hash = hash.to_string();
        let data = data.to_vec();

        tokio::task::spawn_blocking(move || store.put_atomic(&namespace, &hash, &data))
            .await
            .map_err(|e| CacheError::Storage(Box::new(e)))?
    }

    async fn exists(&self, namespace: &str, hash: &str) -> Result<bool, CacheError> {
        let path = self.body_path(namespace, hash);
        Ok(path.exists())
    }

    async fn get(&self, namespace: &str, hash: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.body_path(namespace, hash);
        let data = tokio::fs::read(&path).await?;
        Ok(data)
    }

    async fn remove_namespace(&self, namespace: &str) -> Result<(), CacheError> {
        let path = self.base_path.join(namespace);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!("Removed body tree for namespace {}", namespace);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(e)),
        }
    }
}
