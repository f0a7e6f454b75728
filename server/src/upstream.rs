//! Network client for the app's upstream origin and allowlisted APIs

use crate::cache::{CacheError, CachedResponse};
use appshell_core::ResponseKind;
use reqwest::{Client, Method, header, redirect};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Response headers that must not be captured for replay.
///
/// Hop-by-hop headers describe the original connection, and the gateway sets
/// Content-Type and CORS headers itself.
fn skip_for_replay(name: &str) -> bool {
    matches!(
        name,
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "content-length"
            | "content-type"
            | "access-control-allow-origin"
    )
}

/// Request headers that must not be forwarded upstream.
///
/// Hop-by-hop headers belong to the inbound connection, Host is derived from
/// the target URL, and Accept-Encoding is dropped so upstream bodies arrive
/// uncompressed and replayable.
fn skip_for_forward(name: &str) -> bool {
    matches!(
        name,
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "host"
            | "content-length"
            | "accept-encoding"
    )
}

/// A response captured from the network
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    /// Basic when the final response came from the upstream origin itself
    pub kind: ResponseKind,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    pub fn into_cached(self) -> CachedResponse {
        CachedResponse {
            status: self.status,
            content_type: self.content_type,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// HTTP client used for all outgoing fetches
pub struct UpstreamClient {
    client: Client,
    origin: Url,
}

impl UpstreamClient {
    /// Create a new upstream client for the app origin
    ///
    /// A default User-Agent can be set here; individual fetches may override
    /// it with the requesting client's own (to avoid bot detection upstream).
    pub fn new(origin: Url, user_agent: Option<&str>) -> Result<Self, CacheError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(redirect::Policy::limited(5));

        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua);
        }

        let client = builder.build().map_err(|e| CacheError::Storage(Box::new(e)))?;
        Ok(Self { client, origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve an origin-form path (or an already absolute URL) to a full
    /// target URL.
    pub fn resolve(&self, path_or_url: &str) -> Result<Url, CacheError> {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            return Url::parse(path_or_url)
                .map_err(|e| CacheError::InvalidUrl(format!("{path_or_url}: {e}")));
        }
        self.origin
            .join(path_or_url)
            .map_err(|e| CacheError::InvalidUrl(format!("{path_or_url}: {e}")))
    }

    /// Canonical URL form used in cache keys.
    ///
    /// Same-origin targets reduce to their path and query so cached entries
    /// survive an origin reconfiguration; cross-origin targets keep the full
    /// URL.
    pub fn cache_url(&self, url: &Url) -> String {
        if self.is_same_origin(url) {
            match url.query() {
                Some(q) => format!("{}?{}", url.path(), q),
                None => url.path().to_string(),
            }
        } else {
            url.as_str().to_string()
        }
    }

    /// Whether a URL belongs to the configured upstream origin
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.origin.scheme()
            && url.host_str() == self.origin.host_str()
            && url.port_or_known_default() == self.origin.port_or_known_default()
    }

    /// GET a URL, capturing the full response
    pub async fn get(&self, url: &Url) -> Result<FetchedResponse, reqwest::Error> {
        self.send(Method::GET, url, None, None).await
    }

    /// Forward a request to the network, capturing the full response.
    ///
    /// The incoming request's headers travel with the fetch, minus the
    /// non-forwardable set, so credentials and content negotiation survive
    /// the hop.
    pub async fn send(
        &self,
        method: Method,
        url: &Url,
        headers: Option<&header::HeaderMap>,
        body: Option<Vec<u8>>,
    ) -> Result<FetchedResponse, reqwest::Error> {
        let mut request = self.client.request(method, url.clone());

        if let Some(incoming) = headers {
            let mut forward = header::HeaderMap::new();
            for (name, value) in incoming {
                if !skip_for_forward(name.as_str()) {
                    forward.append(name, value.clone());
                }
            }
            request = request.headers(forward);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;

        let status = response.status().as_u16();
        // Classify against the final URL so redirects off-origin count as opaque
        let kind = ResponseKind::classify(self.is_same_origin(response.url()));

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| !skip_for_replay(name.as_str()))
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        let body = response.bytes().await?.to_vec();
        debug!("🌐 Fetched {} bytes from {} (HTTP {})", body.len(), url, status);

        Ok(FetchedResponse {
            status,
            kind,
            content_type,
            headers,
            body,
        })
    }
}
