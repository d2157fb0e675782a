//! Tool-call bridge: accepts a Claude-shaped request, drives it through the
//! same Gemini-backed flow as `/v1/messages`, and returns a Claude-shaped
//! response. Intended for callers that want a direct, single-shot tool-call
//! round trip without the streaming/SSE machinery.

use crate::proxy::handlers::claude::token_selection::acquire_token;
use crate::proxy::mappers::claude::{transform_claude_request_in, transform_response, ClaudeRequest};
use crate::proxy::server::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use std::collections::HashSet;

pub async fn handle_mcp_messages(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let request: ClaudeRequest = match serde_json::from_value(body) {
        Ok(r) => r,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"type": "error", "error": {"type": "invalid_request_error", "message": e.to_string()}})),
            )
                .into_response();
        },
    };

    let (mapped_model, _reason) =
        crate::proxy::common::resolve_model_route(&request.model, &*state.custom_mapping.read().await);

    let tools_val: Option<Vec<Value>> = request
        .tools
        .as_ref()
        .map(|list| list.iter().map(|t| serde_json::to_value(t).unwrap_or(json!({}))).collect());

    let config = crate::proxy::mappers::request_config::resolve_request_config(
        &request.model,
        &mapped_model,
        &tools_val,
        None,
        None,
    );

    let attempted: HashSet<String> = HashSet::new();
    let token_result = match acquire_token(
        state.token_manager.clone(),
        None,
        &config.request_type,
        &config.final_model,
        None,
        false,
        &attempted,
    )
    .await
    {
        Ok(r) => r,
        Err(response) => return response,
    };

    let mut request_with_mapped = request.clone();
    request_with_mapped.model = mapped_model.clone();

    let gemini_body =
        match transform_claude_request_in(&request_with_mapped, &token_result.project_id, false) {
            Ok(b) => b,
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"type": "error", "error": {"type": "api_error", "message": format!("Transform error: {}", e)}})),
                )
                    .into_response();
            },
        };

    let response = match state
        .upstream
        .call_v1_internal_with_warp(
            "generateContent",
            &token_result.access_token,
            gemini_body,
            None,
            std::collections::HashMap::new(),
            None,
        )
        .await
    {
        Ok(r) => r,
        Err(e) => {
            return (StatusCode::BAD_GATEWAY, format!("Upstream call failed: {}", e)).into_response();
        },
    };

    let status = response.status();
    let bytes = match response.bytes().await {
        Ok(b) => b,
        Err(e) => return (StatusCode::BAD_GATEWAY, format!("Failed to read body: {}", e)).into_response(),
    };

    if !status.is_success() {
        let text = String::from_utf8_lossy(&bytes).to_string();
        return (StatusCode::BAD_GATEWAY, text).into_response();
    }

    let gemini_resp: Value = match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(e) => return (StatusCode::BAD_GATEWAY, format!("Parse error: {}", e)).into_response(),
    };
    let raw = gemini_resp.get("response").unwrap_or(&gemini_resp);

    let gemini_response: crate::proxy::mappers::claude::models::GeminiResponse =
        match serde_json::from_value(raw.clone()) {
            Ok(r) => r,
            Err(e) => {
                return (StatusCode::INTERNAL_SERVER_ERROR, format!("Convert error: {}", e))
                    .into_response();
            },
        };

    let context_limit =
        crate::proxy::mappers::claude::token_scaling::get_context_limit_for_model(&mapped_model);

    match transform_response(&gemini_response, false, context_limit, None, mapped_model) {
        Ok(claude_response) => (StatusCode::OK, Json(claude_response)).into_response(),
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Transform error: {}", e)).into_response()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_body() {
        let result: Result<ClaudeRequest, _> = serde_json::from_value(json!({"not": "a request"}));
        assert!(result.is_err());
    }
}
