//! Background sync queue
//!
//! Payloads that could not reach the upstream while offline are parked in a
//! durable queue and replayed when the sync tag fires. Failures here are
//! caught and logged, never propagated; retry is the host's scheduling
//! policy, not ours.

use crate::WorkerState;
use crate::cache::CacheError;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};
use uuid::Uuid;

/// A payload waiting to be synchronized upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSync {
    pub id: String,
    pub payload: serde_json::Value,
    pub queued_at: String,
}

/// Durable queue of payloads to replay when connectivity returns
#[async_trait::async_trait]
pub trait SyncQueue: Send + Sync {
    /// Park a payload, returning its queue id.
    async fn enqueue(&self, payload: serde_json::Value) -> Result<String, CacheError>;

    /// Read all pending entries in queue order without removing them.
    async fn drain_all(&self) -> Result<Vec<PendingSync>, CacheError>;

    /// Remove the entries with the given ids.
    async fn delete(&self, ids: &[String]) -> Result<(), CacheError>;

    /// Remove every pending entry.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// SQLite-backed implementation of SyncQueue
pub struct SqliteSyncQueue {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSyncQueue {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, CacheError> {
        let conn = Connection::open(db_path)?;
        let queue = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        queue.init_schema()?;
        Ok(queue)
    }

    fn init_schema(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS pending_sync (
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                queued_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl SyncQueue for SqliteSyncQueue {
    async fn enqueue(&self, payload: serde_json::Value) -> Result<String, CacheError> {
        let id = Uuid::new_v4().to_string();
        let payload_json =
            serde_json::to_string(&payload).map_err(|e| CacheError::Database(e.to_string()))?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO pending_sync (id, payload) VALUES (?1, ?2)",
            params![id, payload_json],
        )?;

        debug!("Enqueued sync payload {}", id);
        Ok(id)
    }

    async fn drain_all(&self) -> Result<Vec<PendingSync>, CacheError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT id, payload, queued_at FROM pending_sync ORDER BY rowid")?;
        let rows: Vec<(String, String, String)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, payload_json, queued_at)| {
                let payload = serde_json::from_str(&payload_json)
                    .map_err(|e| CacheError::Database(e.to_string()))?;
                Ok(PendingSync {
                    id,
                    payload,
                    queued_at,
                })
            })
            .collect()
    }

    async fn delete(&self, ids: &[String]) -> Result<(), CacheError> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM pending_sync WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        stmt.execute(rusqlite::params_from_iter(ids.iter()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM pending_sync", [])?;
        Ok(())
    }
}

/// Run the background sync routine for a tag.
///
/// Unknown tags are acknowledged and ignored. Any failure is swallowed
/// after logging so the handler always resolves.
pub async fn run_sync(state: &WorkerState, tag: &str) {
    if tag != state.config.sync_tag {
        info!("🔁 Ignoring unknown sync tag: {}", tag);
        return;
    }

    info!("🔁 Background sync triggered: {}", tag);
    if let Err(e) = sync_pending(state).await {
        error!("❌ Background sync failed: {}", e);
    }
}

async fn sync_pending(state: &WorkerState) -> Result<(), CacheError> {
    let pending = state.sync_queue.drain_all().await?;
    if pending.is_empty() {
        info!("🔁 No pending data to sync");
        return Ok(());
    }

    info!("🔁 Syncing {} pending payloads", pending.len());
    let endpoint = state.upstream.resolve(&state.config.sync_endpoint)?;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    for entry in &pending {
        let body =
            serde_json::to_vec(&entry.payload).map_err(|e| CacheError::Database(e.to_string()))?;
        let response = state
            .upstream
            .send(reqwest::Method::POST, &endpoint, Some(&headers), Some(body))
            .await
            .map_err(|e| CacheError::Upstream(e.to_string()))?;

        if response.status >= 400 {
            return Err(CacheError::Upstream(format!(
                "sync endpoint returned HTTP {} for {}",
                response.status, entry.id
            )));
        }
    }

    // Only the replayed batch is removed; payloads enqueued while the
    // replay was running stay for the next sync
    let replayed: Vec<String> = pending.into_iter().map(|entry| entry.id).collect();
    state.sync_queue.delete(&replayed).await?;
    info!("✅ Sync complete, {} entries replayed", replayed.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_enqueue_and_drain_preserves_entries() {
        let temp_dir = TempDir::new().unwrap();
        let queue = SqliteSyncQueue::new(temp_dir.path().join("test.db")).unwrap();

        let id1 = queue.enqueue(json!({"n": 1})).await.unwrap();
        let id2 = queue.enqueue(json!({"n": 2})).await.unwrap();
        assert_ne!(id1, id2);

        let pending = queue.drain_all().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].payload, json!({"n": 1}));

        // drain_all is a read, not a pop
        assert_eq!(queue.drain_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_spares_payloads_enqueued_during_replay() {
        let temp_dir = TempDir::new().unwrap();
        let queue = SqliteSyncQueue::new(temp_dir.path().join("test.db")).unwrap();

        queue.enqueue(json!({"n": 1})).await.unwrap();
        queue.enqueue(json!({"n": 2})).await.unwrap();
        let replayed: Vec<String> = queue
            .drain_all()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect();

        // Arrives while the drained batch is still being replayed
        queue.enqueue(json!({"n": 3})).await.unwrap();

        queue.delete(&replayed).await.unwrap();
        let pending = queue.drain_all().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, json!({"n": 3}));
    }

    #[tokio::test]
    async fn test_clear_empties_queue() {
        let temp_dir = TempDir::new().unwrap();
        let queue = SqliteSyncQueue::new(temp_dir.path().join("test.db")).unwrap();

        queue.enqueue(json!({"n": 1})).await.unwrap();
        queue.clear().await.unwrap();

        assert!(queue.drain_all().await.unwrap().is_empty());
    }
}
