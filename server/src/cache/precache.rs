//! Precache manifest and install-time population

use crate::cache::{BodyStore, CacheError, CacheIndex, CachedResponse, store_response};
use crate::upstream::UpstreamClient;
use appshell_core::CacheKey;
use tracing::{debug, info};

/// Ordered list of static asset paths fetched and stored at install time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheManifest {
    assets: Vec<String>,
}

impl PrecacheManifest {
    pub fn new(assets: Vec<String>) -> Self {
        Self { assets }
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Fetch and store every manifest entry as a single unit.
///
/// All fetches complete before anything is written, so a failed install
/// leaves the namespace empty rather than partially populated. Every asset
/// must come back as HTTP 200.
pub async fn precache(
    manifest: &PrecacheManifest,
    namespace: &str,
    upstream: &UpstreamClient,
    index: &dyn CacheIndex,
    bodies: &dyn BodyStore,
) -> Result<usize, CacheError> {
    let mut fetched: Vec<(CacheKey, CachedResponse)> = Vec::with_capacity(manifest.len());

    for path in manifest.assets() {
        let url = upstream.resolve(path)?;
        let response = upstream
            .get(&url)
            .await
            .map_err(|e| CacheError::Upstream(format!("{path}: {e}")))?;

        if response.status != 200 {
            return Err(CacheError::Upstream(format!(
                "{path}: HTTP {}",
                response.status
            )));
        }

        let key = CacheKey::for_request("GET", &upstream.cache_url(&url))
            .ok_or_else(|| CacheError::InvalidUrl(path.clone()))?;
        debug!("Precached fetch ok: {} ({} bytes)", path, response.body.len());
        fetched.push((key, response.into_cached()));
    }

    for (key, response) in &fetched {
        store_response(namespace, key, response, index, bodies).await?;
    }

    info!("📦 Precached {} assets into {}", fetched.len(), namespace);
    Ok(fetched.len())
}
