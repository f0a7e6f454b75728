pub mod cache;
pub mod config;
pub mod lifecycle;
pub mod push;
pub mod router;
pub mod server;
pub mod sync;
pub mod upstream;

// Re-export commonly used types
pub use cache::{BodyStore, CacheIndex};
pub use lifecycle::WorkerPhase;
pub use sync::SyncQueue;

use config::WorkerConfig;
use std::sync::Mutex;
use upstream::UpstreamClient;

pub type AppState = std::sync::Arc<WorkerState>;

pub struct WorkerState {
    pub config: WorkerConfig,
    // Current lifecycle phase of this worker version
    phase: Mutex<WorkerPhase>,
    // Cache stores
    pub index: Box<dyn CacheIndex>,
    pub bodies: Box<dyn BodyStore>,
    // Pending background-sync payloads
    pub sync_queue: Box<dyn SyncQueue>,
    pub upstream: UpstreamClient,
}

impl WorkerState {
    pub fn new(
        config: WorkerConfig,
        index: Box<dyn CacheIndex>,
        bodies: Box<dyn BodyStore>,
        sync_queue: Box<dyn SyncQueue>,
        upstream: UpstreamClient,
    ) -> Self {
        Self {
            config,
            phase: Mutex::new(WorkerPhase::Installing),
            index,
            bodies,
            sync_queue,
            upstream,
        }
    }

    pub fn phase(&self) -> WorkerPhase {
        *self.phase.lock().unwrap()
    }

    pub(crate) fn set_phase(&self, phase: WorkerPhase) {
        *self.phase.lock().unwrap() = phase;
    }
}

impl std::fmt::Debug for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerState")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("index", &"<dyn CacheIndex>")
            .field("bodies", &"<dyn BodyStore>")
            .field("sync_queue", &"<dyn SyncQueue>")
            .finish()
    }
}
