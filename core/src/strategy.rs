//! Routing strategy decisions for intercepted requests.
//!
//! Pure functions only: the server crate supplies the URLs and response
//! metadata, this module decides which path they take.

use crate::request::ResponseKind;
use serde::{Deserialize, Serialize};

/// The serving strategy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePlan {
    /// Always fetch upstream; the cache is never read or written.
    NetworkOnly,
    /// Serve from cache when present, fetch and opportunistically populate
    /// the cache on a miss.
    CacheFirst,
}

/// The network-only allowlist: URL substrings that must bypass the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkOnlyList(Vec<String>);

impl NetworkOnlyList {
    pub fn new(patterns: Vec<String>) -> Self {
        // Empty patterns would match every URL
        Self(patterns.into_iter().filter(|p| !p.is_empty()).collect())
    }

    /// Substring match against the full target URL.
    pub fn matches(&self, url: &str) -> bool {
        self.0.iter().any(|pattern| url.contains(pattern.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decide the serving strategy for a target URL.
pub fn plan_route(network_only: &NetworkOnlyList, url: &str) -> RoutePlan {
    if network_only.matches(url) {
        RoutePlan::NetworkOnly
    } else {
        RoutePlan::CacheFirst
    }
}

/// Whether a response may be stored in the cache.
///
/// Only successful same-origin responses qualify; opaque cross-origin and
/// non-200 responses are passed through unmodified and never stored.
pub fn is_cacheable(status: u16, kind: ResponseKind) -> bool {
    status == 200 && kind == ResponseKind::Basic
}

/// Normalized cache key for a request: method + URL with the fragment
/// stripped. Only GET requests are cache-eligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key for a cache-eligible request, `None` for non-GET methods.
    pub fn for_request(method: &str, url: &str) -> Option<Self> {
        if !method.eq_ignore_ascii_case("GET") {
            return None;
        }
        let url = url.split('#').next().unwrap_or(url);
        Some(CacheKey(format!("GET {url}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
