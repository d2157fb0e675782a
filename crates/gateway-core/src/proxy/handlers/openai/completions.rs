//! Legacy `/v1/completions` support.
//!
//! The legacy completions API predates chat messages and takes a flat
//! `prompt` string. We normalize it into a single user message and run it
//! through the same chat-completions pipeline.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;

use super::chat::handle_chat_completions;
use crate::proxy::server::AppState;

pub mod request_parser {
    use crate::proxy::mappers::openai::{OpenAIContent, OpenAIMessage, OpenAIRequest};

    /// Ensures `messages` is non-empty, synthesizing a single user message
    /// from the legacy `prompt` field when the caller used the old shape.
    pub fn ensure_non_empty_messages(req: &mut OpenAIRequest) {
        if !req.messages.is_empty() {
            return;
        }
        if let Some(prompt) = req.prompt.take() {
            req.messages.push(OpenAIMessage {
                role: "user".to_string(),
                content: Some(OpenAIContent::String(prompt)),
                reasoning_content: None,
                tool_calls: None,
                tool_call_id: None,
                name: None,
            });
        }
    }
}

/// Handles `POST /v1/completions` by reshaping the legacy `prompt` field into
/// a chat message and delegating to [`handle_chat_completions`].
pub async fn handle_completions(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(mut body): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if body.get("messages").is_none() {
        if let Some(prompt) = body.get("prompt").cloned() {
            body.as_object_mut().map(|obj| {
                obj.insert(
                    "messages".to_string(),
                    serde_json::json!([{ "role": "user", "content": prompt }]),
                )
            });
        }
    }

    handle_chat_completions(State(state), headers, Json(body)).await
}
