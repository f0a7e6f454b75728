//! Gateway configuration from environment variables

use crate::cache::CacheError;
use crate::cache::precache::PrecacheManifest;
use appshell_core::NetworkOnlyList;
use std::path::PathBuf;
use url::Url;

const DEFAULT_PRECACHE: &str = "/,/index.html,/manifest.json,/icon-192.png,/icon-512.png";
const DEFAULT_SYNC_TAG: &str = "sync-sermon-data";
const DEFAULT_SYNC_ENDPOINT: &str = "/api/sync-sermon";

/// Worker configuration
///
/// Everything the routing and lifecycle code needs, resolved once at
/// startup. Bumping `cache_name` invalidates the entire cache on the next
/// activation.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Cache namespace version identifier
    pub cache_name: String,
    /// Static assets fetched and stored at install time
    pub precache: PrecacheManifest,
    /// URL substrings that always bypass the cache
    pub network_only: NetworkOnlyList,
    /// Origin the gateway fronts; origin-form requests resolve against it
    pub upstream_origin: Url,
    /// Path of the entry document served as the offline navigation fallback
    pub shell_path: String,
    /// Background sync tag this worker responds to
    pub sync_tag: String,
    /// Upstream path pending sync payloads are POSTed to
    pub sync_endpoint: String,
    /// App name used as the notification title
    pub app_name: String,
    /// Notification body used when a push carries no payload
    pub default_push_body: String,
    /// Activate immediately after install instead of waiting
    pub skip_waiting: bool,
    pub storage_dir: PathBuf,
    pub listen_addr: String,
}

impl WorkerConfig {
    /// Load configuration from `APPSHELL_*` environment variables,
    /// falling back to defaults suitable for local development.
    pub fn from_env() -> Result<Self, CacheError> {
        let upstream_origin = env_or("APPSHELL_UPSTREAM_ORIGIN", "http://127.0.0.1:8080");
        let upstream_origin = Url::parse(&upstream_origin)
            .map_err(|e| CacheError::InvalidUrl(format!("{upstream_origin}: {e}")))?;

        Ok(Self {
            cache_name: env_or("APPSHELL_CACHE_NAME", "appshell-v1.0.0"),
            precache: PrecacheManifest::new(csv(&env_or("APPSHELL_PRECACHE", DEFAULT_PRECACHE))),
            network_only: NetworkOnlyList::new(csv(&env_or("APPSHELL_NETWORK_ONLY", ""))),
            upstream_origin,
            shell_path: env_or("APPSHELL_SHELL_PATH", "/index.html"),
            sync_tag: env_or("APPSHELL_SYNC_TAG", DEFAULT_SYNC_TAG),
            sync_endpoint: env_or("APPSHELL_SYNC_ENDPOINT", DEFAULT_SYNC_ENDPOINT),
            app_name: env_or("APPSHELL_APP_NAME", "Appshell"),
            default_push_body: env_or("APPSHELL_PUSH_DEFAULT_BODY", "Novo conteúdo disponível!"),
            skip_waiting: env_or("APPSHELL_SKIP_WAITING", "true") != "false",
            storage_dir: PathBuf::from(env_or("APPSHELL_STORAGE_DIR", "./appshell-storage")),
            listen_addr: env_or("APPSHELL_LISTEN_ADDR", "127.0.0.1:8788"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_parsing() {
        assert_eq!(csv("/a, /b ,/c"), vec!["/a", "/b", "/c"]);
        assert_eq!(csv(""), Vec::<String>::new());
        assert_eq!(csv(" , "), Vec::<String>::new());
    }

    #[test]
    fn test_default_sync_targets_sermon_api() {
        if std::env::var_os("APPSHELL_SYNC_TAG").is_some()
            || std::env::var_os("APPSHELL_SYNC_ENDPOINT").is_some()
        {
            return;
        }
        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.sync_tag, "sync-sermon-data");
        assert_eq!(config.sync_endpoint, "/api/sync-sermon");
    }

    #[test]
    fn test_default_precache_matches_shell_assets() {
        let assets = csv(DEFAULT_PRECACHE);
        assert_eq!(
            assets,
            vec!["/", "/index.html", "/manifest.json", "/icon-192.png", "/icon-512.png"]
        );
    }
}
