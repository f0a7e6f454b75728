//! SQLite implementation of the CacheIndex trait

use crate::cache::{CacheError, CacheIndex, EntryMetadata};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// SQLite-backed implementation of CacheIndex
pub struct SqliteCacheIndex {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCacheIndex {
    /// Create a new SQLite cache index
    ///
    /// If the database doesn't exist, it will be created with the required schema.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, CacheError> {
        let conn = Connection::open(db_path)?;
        let index = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        index.init_schema()?;
        Ok(index)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock().unwrap();

        // Cache entries table: one row per (namespace, request key)
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                namespace TEXT NOT NULL,
                cache_key TEXT NOT NULL,
                sha256_hash TEXT NOT NULL,
                status INTEGER NOT NULL,
                content_type TEXT NOT NULL,
                headers TEXT NOT NULL,
                size INTEGER NOT NULL,
                stored_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (namespace, cache_key)
            )
            "#,
            [],
        )?;

        // Index for namespace enumeration and purges
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cache_entries_namespace ON cache_entries(namespace)",
            [],
        )?;

        info!("Cache index schema initialized");
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheIndex for SqliteCacheIndex {
    async fn insert_entry(&self, namespace: &str, meta: EntryMetadata) -> Result<(), CacheError> {
        let headers_json =
            serde_json::to_string(&meta.headers).map_err(|e| CacheError::Database(e.to_string()))?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT OR REPLACE INTO cache_entries
                (namespace, cache_key, sha256_hash, status, content_type, headers, size, stored_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, CURRENT_TIMESTAMP)
            "#,
            params![
                namespace,
                meta.cache_key,
                meta.sha256_hash,
                meta.status as i64,
                meta.content_type,
                headers_json,
                meta.size as i64
            ],
        )?;

        debug!(
            "Indexed cache entry: ns={}, key={}, size={}",
            namespace, meta.cache_key, meta.size
        );
        Ok(())
    }

    async fn lookup(
        &self,
        namespace: &str,
        cache_key: &str,
    ) -> Result<Option<EntryMetadata>, CacheError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            r#"
            SELECT cache_key, sha256_hash, status, content_type, headers, size
            FROM cache_entries
            WHERE namespace = ?1 AND cache_key = ?2
            "#,
        )?;
        let mut rows = stmt.query_map(params![namespace, cache_key], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        match rows.next() {
            Some(Ok((cache_key, sha256_hash, status, content_type, headers_json, size))) => {
                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                    .map_err(|e| CacheError::Database(e.to_string()))?;
                Ok(Some(EntryMetadata {
                    cache_key,
                    sha256_hash,
                    status: status as u16,
                    content_type,
                    headers,
                    size: size as u64,
                }))
            }
            Some(Err(e)) => Err(CacheError::Database(e.to_string())),
            None => Ok(None),
        }
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, CacheError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT DISTINCT namespace FROM cache_entries ORDER BY namespace")?;
        let namespaces: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(namespaces)
    }

    async fn purge_namespace(&self, namespace: &str) -> Result<u64, CacheError> {
        let conn = self.conn.lock().unwrap();

        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE namespace = ?1",
            params![namespace],
        )?;

        debug!("Purged {} entries from namespace {}", removed, namespace);
        Ok(removed as u64)
    }

    async fn entry_count(&self, namespace: &str) -> Result<u64, CacheError> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entry(key: &str) -> EntryMetadata {
        EntryMetadata {
            cache_key: key.to_string(),
            sha256_hash: "sha256-hash-456".to_string(),
            status: 200,
            content_type: "text/html; charset=utf-8".to_string(),
            headers: vec![("etag".to_string(), "\"abc\"".to_string())],
            size: 1024,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let index = SqliteCacheIndex::new(temp_dir.path().join("test.db")).unwrap();

        index
            .insert_entry("app-v1", sample_entry("GET https://example.com/index.html"))
            .await
            .unwrap();

        let found = index
            .lookup("app-v1", "GET https://example.com/index.html")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, 200);
        assert_eq!(found.sha256_hash, "sha256-hash-456");
        assert_eq!(found.headers[0].0, "etag");

        let miss = index
            .lookup("app-v1", "GET https://example.com/other")
            .await
            .unwrap();
        assert!(miss.is_none());

        // Same key in another namespace is a separate entry
        let other_ns = index
            .lookup("app-v2", "GET https://example.com/index.html")
            .await
            .unwrap();
        assert!(other_ns.is_none());
    }

    #[tokio::test]
    async fn test_insert_replaces_existing_key() {
        let temp_dir = TempDir::new().unwrap();
        let index = SqliteCacheIndex::new(temp_dir.path().join("test.db")).unwrap();

        index
            .insert_entry("app-v1", sample_entry("GET https://a/x"))
            .await
            .unwrap();
        let mut updated = sample_entry("GET https://a/x");
        updated.sha256_hash = "new-hash".to_string();
        index.insert_entry("app-v1", updated).await.unwrap();

        assert_eq!(index.entry_count("app-v1").await.unwrap(), 1);
        let found = index.lookup("app-v1", "GET https://a/x").await.unwrap().unwrap();
        assert_eq!(found.sha256_hash, "new-hash");
    }

    #[tokio::test]
    async fn test_namespace_listing_and_purge() {
        let temp_dir = TempDir::new().unwrap();
        let index = SqliteCacheIndex::new(temp_dir.path().join("test.db")).unwrap();

        index
            .insert_entry("app-v1", sample_entry("GET https://a/x"))
            .await
            .unwrap();
        index
            .insert_entry("app-v1", sample_entry("GET https://a/y"))
            .await
            .unwrap();
        index
            .insert_entry("app-v2", sample_entry("GET https://a/x"))
            .await
            .unwrap();

        assert_eq!(
            index.list_namespaces().await.unwrap(),
            vec!["app-v1".to_string(), "app-v2".to_string()]
        );

        let removed = index.purge_namespace("app-v1").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(index.list_namespaces().await.unwrap(), vec!["app-v2".to_string()]);
        assert_eq!(index.entry_count("app-v1").await.unwrap(), 0);
        assert_eq!(index.entry_count("app-v2").await.unwrap(), 1);
    }
}
