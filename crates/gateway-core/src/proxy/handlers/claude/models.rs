//! Model listing and token counting handlers

use crate::proxy::server::AppState;
use axum::http::HeaderMap;
use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

pub async fn handle_list_models(State(state): State<AppState>) -> impl IntoResponse {
    use crate::proxy::common::model_mapping::collect_all_model_ids;

    let sorted_ids = collect_all_model_ids(
        &state.token_manager.get_all_available_models(),
        &state.custom_mapping,
    )
    .await;

    let data: Vec<_> = sorted_ids
        .into_iter()
        .map(|id| {
            json!({
                "id": id,
                "object": "model",
                "created": 1_706_745_600,
                "owned_by": "antigravity"
            })
        })
        .collect();

    Json(json!({
        "object": "list",
        "data": data
    }))
}

pub async fn handle_count_tokens(
    State(state): State<AppState>,
    _headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    use crate::proxy::mappers::claude::ClaudeRequest;

    let provider = state.providers_anthropic.read().await.clone();
    let passthrough_enabled = provider.enabled
        && !matches!(provider.dispatch_mode, gateway_types::models::ProviderDispatchMode::Off);

    if passthrough_enabled {
        if let Ok(request) = serde_json::from_value::<ClaudeRequest>(body) {
            let url = format!("{}/v1/messages/count_tokens", provider.base_url.trim_end_matches('/'));
            let mut forwarded = request;
            if let Some(mapped) = provider.model_mapping.get(&forwarded.model) {
                forwarded.model = mapped.clone();
            }
            let client = reqwest::Client::new();
            if let Ok(upstream_response) = client
                .post(&url)
                .header("x-api-key", &provider.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&forwarded)
                .send()
                .await
            {
                let status = upstream_response.status();
                if let Ok(body) = upstream_response.json::<Value>().await {
                    return (status, Json(body)).into_response();
                }
            }
        }
    }

    // Without the passthrough provider, Anthropic format cannot be forwarded to Gemini countTokens.
    (
        axum::http::StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "error": {
                "type": "not_implemented",
                "message": "Token counting requires the Anthropic passthrough provider to be enabled"
            }
        })),
    )
        .into_response()
}
