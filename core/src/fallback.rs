//! Synthesized responses for requests that cannot be served.

use serde::{Deserialize, Serialize};

/// A response fabricated locally instead of coming from cache or network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

/// JSON body returned when a network-only API request fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiOfflineBody {
    pub error: String,
    pub message: String,
}

/// 503 returned when an allowlisted API is unreachable.
pub fn api_offline() -> SynthesizedResponse {
    let body = ApiOfflineBody {
        error: "Sem conexão".to_string(),
        message: "Verifique sua conexão com a internet".to_string(),
    };
    SynthesizedResponse {
        status: 503,
        content_type: "application/json",
        // Serializing a two-string struct cannot fail
        body: serde_json::to_string(&body).unwrap_or_default(),
    }
}

/// 503 returned when a non-document resource is unavailable offline.
pub fn resource_offline() -> SynthesizedResponse {
    SynthesizedResponse {
        status: 503,
        content_type: "text/plain; charset=utf-8",
        body: "Recurso não disponível offline".to_string(),
    }
}
