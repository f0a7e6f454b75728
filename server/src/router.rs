//! Request routing: the fetch interception path
//!
//! Every request that is not a control endpoint lands here. Allowlisted API
//! URLs are network-only; everything else is cache-first with opportunistic
//! population and a destination-aware offline fallback. Every path resolves
//! to a response; no error leaves this module.

use crate::AppState;
use crate::cache::{CachedResponse, match_request, store_response};
use crate::upstream::FetchedResponse;
use appshell_core::{
    CacheKey, Destination, RoutePlan, SynthesizedResponse, api_offline, is_cacheable, plan_route,
    resource_offline,
};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Upper bound on request bodies forwarded upstream
const MAX_FORWARD_BODY: usize = 10 * 1024 * 1024;

pub async fn handle_fetch(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    // Absolute-form targets route by their own origin; origin-form resolves
    // against the configured upstream
    let raw_target = if parts.uri.authority().is_some() {
        parts.uri.to_string()
    } else {
        parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string())
    };
    let target = match state.upstream.resolve(&raw_target) {
        Ok(url) => url,
        Err(e) => {
            warn!("Rejecting unroutable request {}: {}", raw_target, e);
            return (StatusCode::BAD_REQUEST, "Invalid request target").into_response();
        }
    };

    match plan_route(&state.config.network_only, target.as_str()) {
        RoutePlan::NetworkOnly => network_only(&state, &parts, body, &target).await,
        RoutePlan::CacheFirst => cache_first(&state, &parts, body, &target).await,
    }
}

/// Always fetch upstream; the cache is never read or written on this path.
/// A network failure synthesizes the offline API error.
async fn network_only(state: &AppState, parts: &Parts, body: Body, target: &Url) -> Response {
    debug!("🌐 Network-only: {} {}", parts.method, target);

    let body_bytes = match axum::body::to_bytes(body, MAX_FORWARD_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read request body for {}: {}", target, e);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);
    let outgoing = if body_bytes.is_empty() {
        None
    } else {
        Some(body_bytes.to_vec())
    };

    match state
        .upstream
        .send(method, target, Some(&parts.headers), outgoing)
        .await
    {
        Ok(fetched) => passthrough_response(fetched),
        Err(e) => {
            warn!("❌ Network-only fetch failed for {}: {}", target, e);
            synthesized(api_offline())
        }
    }
}

/// Cache-first: serve a hit directly, populate opportunistically on a miss,
/// fall back to the cached shell (documents) or a 503 when offline.
async fn cache_first(state: &AppState, parts: &Parts, body: Body, target: &Url) -> Response {
    let cache_key = CacheKey::for_request(parts.method.as_str(), &state.upstream.cache_url(target));

    if let Some(key) = &cache_key {
        match match_request(
            &state.config.cache_name,
            key,
            state.index.as_ref(),
            state.bodies.as_ref(),
        )
        .await
        {
            Ok(Some(cached)) => {
                debug!("📦 Serving from cache: {}", target);
                return replay_response(cached);
            }
            Ok(None) => {}
            // A broken cache read falls through to the network
            Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
        }
    }

    debug!("🌐 Cache miss, fetching: {}", target);
    let body_bytes = match axum::body::to_bytes(body, MAX_FORWARD_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read request body for {}: {}", target, e);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };
    let outgoing = if body_bytes.is_empty() {
        None
    } else {
        Some(body_bytes.to_vec())
    };
    let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);

    match state
        .upstream
        .send(method, target, Some(&parts.headers), outgoing)
        .await
    {
        Ok(fetched) => {
            if let Some(key) = cache_key {
                if is_cacheable(fetched.status, fetched.kind) {
                    // Fire-and-forget: the write may race with or follow the
                    // response send; failures are logged, never surfaced
                    let state = Arc::clone(state);
                    let cached = fetched.clone().into_cached();
                    tokio::spawn(async move {
                        if let Err(e) = store_response(
                            &state.config.cache_name,
                            &key,
                            &cached,
                            state.index.as_ref(),
                            state.bodies.as_ref(),
                        )
                        .await
                        {
                            error!("Failed to cache {}: {}", key, e);
                        }
                    });
                }
            }
            passthrough_response(fetched)
        }
        Err(e) => {
            warn!("❌ Fetch failed for {}: {}", target, e);
            let destination = Destination::from_request(
                header_str(parts, "sec-fetch-dest"),
                header_str(parts, header::ACCEPT.as_str()),
            );
            offline_fallback(state, destination).await
        }
    }
}

/// Both cache and network failed: navigations get the cached shell
/// document, everything else a synthesized 503.
async fn offline_fallback(state: &AppState, destination: Destination) -> Response {
    if destination.is_document() {
        if let Ok(shell_url) = state.upstream.resolve(&state.config.shell_path) {
            if let Some(key) = CacheKey::for_request("GET", &state.upstream.cache_url(&shell_url)) {
                match match_request(
                    &state.config.cache_name,
                    &key,
                    state.index.as_ref(),
                    state.bodies.as_ref(),
                )
                .await
                {
                    Ok(Some(shell)) => {
                        info!("📄 Serving cached shell for offline navigation");
                        return replay_response(shell);
                    }
                    Ok(None) => warn!("Offline shell {} not cached", state.config.shell_path),
                    Err(e) => warn!("Offline shell lookup failed: {}", e),
                }
            }
        }
    }

    synthesized(resource_offline())
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|h| h.to_str().ok())
}

fn build_response(
    status: u16,
    content_type: &str,
    headers: &[(String, String)],
    body: Vec<u8>,
) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn replay_response(cached: CachedResponse) -> Response {
    build_response(cached.status, &cached.content_type, &cached.headers, cached.body)
}

fn passthrough_response(fetched: FetchedResponse) -> Response {
    build_response(
        fetched.status,
        &fetched.content_type,
        &fetched.headers,
        fetched.body,
    )
}

fn synthesized(response: SynthesizedResponse) -> Response {
    build_response(
        response.status,
        response.content_type,
        &[],
        response.body.into_bytes(),
    )
}
