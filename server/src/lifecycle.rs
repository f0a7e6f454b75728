//! Worker lifecycle: install, activate, skip-waiting
//!
//! Install precaches the manifest as a single atomic unit. Activation purges
//! every cache namespace except the current one, so at most one version of
//! the cache survives. A worker configured without `skip_waiting` parks in
//! the Waiting phase until a SKIP_WAITING control message arrives.

use crate::WorkerState;
use crate::cache::{CacheError, precache};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Installing,
    Waiting,
    Activating,
    Activated,
}

impl WorkerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerPhase::Installing => "installing",
            WorkerPhase::Waiting => "waiting",
            WorkerPhase::Activating => "activating",
            WorkerPhase::Activated => "activated",
        }
    }
}

impl WorkerState {
    /// Install this worker version: precache the manifest, then either
    /// activate immediately or park in the waiting phase.
    ///
    /// Precache is all-or-nothing; an install error leaves the namespace
    /// empty and the caller decides whether to retry.
    pub async fn install(&self) -> Result<usize, CacheError> {
        info!("⚙️  Installing worker (cache {})", self.config.cache_name);
        self.set_phase(WorkerPhase::Installing);

        let count = precache::precache(
            &self.config.precache,
            &self.config.cache_name,
            &self.upstream,
            self.index.as_ref(),
            self.bodies.as_ref(),
        )
        .await?;
        info!("✅ Install complete: {} assets cached", count);

        if self.config.skip_waiting {
            self.activate().await?;
        } else {
            self.set_phase(WorkerPhase::Waiting);
            info!("⏸  Worker installed, waiting for activation");
        }

        Ok(count)
    }

    /// Activate this worker version: purge every stale cache namespace and
    /// begin serving all traffic.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        info!("⚙️  Activating worker (cache {})", self.config.cache_name);
        self.set_phase(WorkerPhase::Activating);

        let mut purged = Vec::new();
        for namespace in self.index.list_namespaces().await? {
            if namespace != self.config.cache_name {
                info!("🗑  Removing stale cache namespace: {}", namespace);
                self.index.purge_namespace(&namespace).await?;
                // The index purge is the source of truth; leftover body files
                // are unreachable and only waste disk
                if let Err(e) = self.bodies.remove_namespace(&namespace).await {
                    warn!("Failed to remove body files for {}: {}", namespace, e);
                }
                purged.push(namespace);
            }
        }

        self.set_phase(WorkerPhase::Activated);
        info!("✅ Worker activated, serving all requests");
        Ok(purged)
    }

    /// Handle a SKIP_WAITING control message: a waiting worker activates
    /// immediately, any other phase ignores the message.
    pub async fn skip_waiting(&self) -> Result<(), CacheError> {
        match self.phase() {
            WorkerPhase::Waiting => {
                info!("⏩ Skip-waiting requested, activating now");
                self.activate().await?;
            }
            phase => {
                info!("Skip-waiting ignored in phase {}", phase.as_str());
            }
        }
        Ok(())
    }
}
