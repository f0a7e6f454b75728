//! Versioned response cache for the appshell gateway
//!
//! This module provides abstractions for storing and retrieving captured
//! HTTP responses under a versioned cache namespace. The index (metadata)
//! and the response bodies are kept behind separate traits so storage
//! backends can vary independently.

pub mod hash;
pub mod local;
pub mod precache;
pub mod sqlite;

use appshell_core::CacheKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Database(e.to_string())
    }
}

/// A captured HTTP response: status, replayable headers and body.
///
/// This is the value side of a cache entry; the key is the normalized
/// request descriptor ([`CacheKey`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    /// Full Content-Type header value, stored apart from the other headers.
    pub content_type: String,
    /// Remaining response headers, hop-by-hop headers already stripped.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Index row describing a cached entry
#[derive(Debug, Clone)]
pub struct EntryMetadata {
    /// The normalized request key (method + URL)
    pub cache_key: String,
    /// SHA-256 of the body (storage key in the body store)
    pub sha256_hash: String,
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    /// Body size in bytes
    pub size: u64,
}

/// Trait for the cache entry index
///
/// Entries are scoped by namespace (the cache version identifier); purging a
/// namespace removes every entry stored under it.
#[async_trait::async_trait]
pub trait CacheIndex: Send + Sync {
    /// Insert or replace the entry for a cache key within a namespace.
    async fn insert_entry(&self, namespace: &str, meta: EntryMetadata) -> Result<(), CacheError>;

    /// Exact-key lookup within a namespace.
    ///
    /// Returns `None` if the key has no entry.
    async fn lookup(
        &self,
        namespace: &str,
        cache_key: &str,
    ) -> Result<Option<EntryMetadata>, CacheError>;

    /// List every namespace that currently holds entries.
    async fn list_namespaces(&self) -> Result<Vec<String>, CacheError>;

    /// Delete all entries under a namespace. Returns the number removed.
    async fn purge_namespace(&self, namespace: &str) -> Result<u64, CacheError>;

    /// Number of entries under a namespace.
    async fn entry_count(&self, namespace: &str) -> Result<u64, CacheError>;
}

/// Trait for physical storage of response bodies
///
/// Bodies are stored per namespace under their SHA-256 hash, so purging a
/// stale cache version is a single subtree removal.
#[async_trait::async_trait]
pub trait BodyStore: Send + Sync {
    /// Store body bytes under a hash.
    ///
    /// This operation should be atomic: either the body is fully stored or
    /// not at all.
    async fn put(&self, namespace: &str, hash: &str, data: &[u8]) -> Result<(), CacheError>;

    /// Check if a body exists in the store.
    async fn exists(&self, namespace: &str, hash: &str) -> Result<bool, CacheError>;

    /// Read body bytes from the store.
    async fn get(&self, namespace: &str, hash: &str) -> Result<Vec<u8>, CacheError>;

    /// Remove every body stored under a namespace.
    async fn remove_namespace(&self, namespace: &str) -> Result<(), CacheError>;
}

/// Store a captured response under a cache key.
///
/// Writes the body first, then the index row, so a reader never finds an
/// entry whose body is missing.
pub async fn store_response(
    namespace: &str,
    cache_key: &CacheKey,
    response: &CachedResponse,
    index: &dyn CacheIndex,
    bodies: &dyn BodyStore,
) -> Result<(), CacheError> {
    let sha256_hash = hash::sha256(&response.body);

    if bodies.exists(namespace, &sha256_hash).await? {
        debug!("♻️  Body already stored: sha256={}", &sha256_hash[..16]);
    } else {
        bodies.put(namespace, &sha256_hash, &response.body).await?;
    }

    index
        .insert_entry(
            namespace,
            EntryMetadata {
                cache_key: cache_key.as_str().to_string(),
                sha256_hash: sha256_hash.clone(),
                status: response.status,
                content_type: response.content_type.clone(),
                headers: response.headers.clone(),
                size: response.body.len() as u64,
            },
        )
        .await?;

    debug!(
        "💾 Cached entry: key={}, sha256={} ({} bytes)",
        cache_key,
        &sha256_hash[..16],
        response.body.len()
    );
    Ok(())
}

/// Exact-key lookup of a captured response.
///
/// An index row whose body has gone missing is treated as a miss so the
/// router falls through to the network instead of failing the request.
pub async fn match_request(
    namespace: &str,
    cache_key: &CacheKey,
    index: &dyn CacheIndex,
    bodies: &dyn BodyStore,
) -> Result<Option<CachedResponse>, CacheError> {
    let Some(meta) = index.lookup(namespace, cache_key.as_str()).await? else {
        return Ok(None);
    };

    match bodies.get(namespace, &meta.sha256_hash).await {
        Ok(body) => Ok(Some(CachedResponse {
            status: meta.status,
            content_type: meta.content_type,
            headers: meta.headers,
            body,
        })),
        Err(e) => {
            // The hash comes from the database, so never assume its length
            warn!(
                "⚠️  Entry indexed but body missing (key={}, sha256={}): {}",
                cache_key,
                meta.sha256_hash.get(..16).unwrap_or(meta.sha256_hash.as_str()),
                e
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::local::LocalBodyStore;
    use crate::cache::sqlite::SqliteCacheIndex;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dangling_entry_with_short_hash_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let index = SqliteCacheIndex::new(temp_dir.path().join("test.db")).unwrap();
        let bodies = LocalBodyStore::new(temp_dir.path().join("bodies")).unwrap();

        // Hand-written row whose body was never stored and whose hash is
        // shorter than a real digest
        index
            .insert_entry(
                "ns",
                EntryMetadata {
                    cache_key: "GET /x".to_string(),
                    sha256_hash: "abc".to_string(),
                    status: 200,
                    content_type: "text/plain".to_string(),
                    headers: vec![],
                    size: 0,
                },
            )
            .await
            .unwrap();

        let key = CacheKey::for_request("GET", "/x").unwrap();
        let found = match_request("ns", &key, &index, &bodies).await.unwrap();
        assert!(found.is_none());
    }
}
