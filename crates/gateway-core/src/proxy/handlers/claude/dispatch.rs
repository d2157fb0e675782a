//! Routes `claude-*` requests to the configured Anthropic-compatible
//! passthrough provider instead of (or in addition to) the Gemini-backed
//! flow, per the provider's `dispatch_mode`.

use crate::proxy::mappers::claude::ClaudeRequest;
use crate::proxy::server::AppState;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use gateway_types::models::ProviderDispatchMode;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

static PASSTHROUGH_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(600))
        .tcp_nodelay(true)
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Outcome of evaluating the provider's dispatch mode for one request.
pub struct DispatchDecision {
    /// If true, the caller should forward to the passthrough provider
    /// immediately and skip the Gemini flow entirely.
    pub use_passthrough: bool,
    /// If true, the Gemini flow should run first; the passthrough
    /// provider is only tried once every account is exhausted.
    pub is_fallback_candidate: bool,
}

/// Decides whether a request should bypass, fall back to, or ignore the
/// Anthropic passthrough provider.
pub async fn decide_dispatch_mode(
    state: &AppState,
    request: &ClaudeRequest,
    trace_id: &str,
) -> DispatchDecision {
    let provider = state.providers_anthropic.read().await;
    if !provider.enabled || !request.model.starts_with("claude-") {
        return DispatchDecision { use_passthrough: false, is_fallback_candidate: false };
    }

    match provider.dispatch_mode {
        ProviderDispatchMode::Off => {
            DispatchDecision { use_passthrough: false, is_fallback_candidate: false }
        },
        ProviderDispatchMode::Always => {
            tracing::info!("[{}] dispatch_mode=always, routing to passthrough provider", trace_id);
            DispatchDecision { use_passthrough: true, is_fallback_candidate: false }
        },
        ProviderDispatchMode::Fallback => {
            DispatchDecision { use_passthrough: false, is_fallback_candidate: true }
        },
    }
}

/// Remaps the request's model per `providers.anthropic.model_mapping`,
/// forwards it to the passthrough provider, and proxies the response
/// (streaming or unary) back unchanged.
pub async fn forward_to_passthrough_provider(
    state: &AppState,
    headers: &HeaderMap,
    request: &ClaudeRequest,
) -> Result<Response, String> {
    let provider = state.providers_anthropic.read().await.clone();

    let mut forwarded = request.clone();
    if let Some(mapped) = provider.model_mapping.get(&forwarded.model) {
        forwarded.model = mapped.clone();
    }

    let url = format!("{}/v1/messages", provider.base_url.trim_end_matches('/'));

    let mut req = PASSTHROUGH_CLIENT
        .post(&url)
        .header("x-api-key", &provider.api_key)
        .header("anthropic-version", "2023-06-01")
        .header("content-type", "application/json")
        .json(&forwarded);

    if let Some(beta) = headers.get("anthropic-beta") {
        req = req.header("anthropic-beta", beta);
    }

    let upstream_response =
        req.send().await.map_err(|e| format!("Passthrough provider request failed: {}", e))?;

    let status = upstream_response.status();
    let content_type = upstream_response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();

    let body_stream = upstream_response.bytes_stream().map_err(std::io::Error::other);
    let axum_body = axum::body::Body::from_stream(body_stream);

    let response = axum::http::Response::builder()
        .status(status)
        .header("content-type", content_type)
        .body(axum_body)
        .map_err(|e| format!("Failed to build passthrough response: {}", e))?;

    Ok(response.into_response())
}
