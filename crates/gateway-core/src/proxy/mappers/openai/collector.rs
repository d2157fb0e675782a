//! Collects an OpenAI-shaped SSE chunk stream back into a single
//! `chat.completion` JSON response, for clients that asked for a
//! non-streaming response even though the upstream was called in stream
//! mode (done for quota reasons — see [`super::super::super::handlers::openai`]).

use super::models::{Choice, OpenAIMessage, OpenAIResponse, OpenAIUsage, ToolCall, ToolFunction};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use std::io;

#[derive(Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Reads a stream of `data: {...}\n\n` lines (as produced by
/// [`super::streaming::create_openai_sse_stream`]) and reconstructs the
/// equivalent unary [`OpenAIResponse`].
pub async fn collect_openai_stream_to_json<S>(mut stream: S) -> Result<OpenAIResponse, String>
where
    S: futures::Stream<Item = Result<Bytes, io::Error>> + Unpin,
{
    let mut id = String::new();
    let mut model = String::new();
    let mut created: u64 = 0;
    let mut content = String::new();
    let mut reasoning_content = String::new();
    let mut tool_calls: Vec<PendingToolCall> = Vec::new();
    let mut finish_reason: Option<String> = None;
    let mut usage: Option<OpenAIUsage> = None;

    let mut line_buffer = String::new();
    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| format!("Stream error: {}", e))?;
        line_buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(newline_pos) = line_buffer.find('\n') {
            let line = line_buffer[..newline_pos].trim_end_matches('\r').to_string();
            line_buffer = line_buffer[newline_pos + 1..].to_string();

            if line.is_empty() || !line.starts_with("data: ") {
                continue;
            }
            let payload = line.trim_start_matches("data: ").trim();
            if payload == "[DONE]" {
                continue;
            }
            let Ok(event) = serde_json::from_str::<Value>(payload) else { continue };

            if let Some(e_id) = event.get("id").and_then(Value::as_str) {
                id = e_id.to_string();
            }
            if let Some(e_model) = event.get("model").and_then(Value::as_str) {
                model = e_model.to_string();
            }
            if let Some(e_created) = event.get("created").and_then(Value::as_u64) {
                created = e_created;
            }
            if let Some(e_usage) = event.get("usage") {
                if let Ok(u) = serde_json::from_value::<OpenAIUsage>(e_usage.clone()) {
                    usage = Some(u);
                }
            }

            let Some(choice) = event.get("choices").and_then(Value::as_array).and_then(|c| c.first())
            else {
                continue;
            };
            if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
                finish_reason = Some(reason.to_string());
            }
            let Some(delta) = choice.get("delta") else { continue };
            if let Some(text) = delta.get("content").and_then(Value::as_str) {
                content.push_str(text);
            }
            if let Some(text) = delta.get("reasoning_content").and_then(Value::as_str) {
                reasoning_content.push_str(text);
            }
            if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
                for call in calls {
                    let index = call.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
                    while tool_calls.len() <= index {
                        tool_calls.push(PendingToolCall::default());
                    }
                    let entry = &mut tool_calls[index];
                    if let Some(call_id) = call.get("id").and_then(Value::as_str) {
                        entry.id = call_id.to_string();
                    }
                    if let Some(func) = call.get("function") {
                        if let Some(name) = func.get("name").and_then(Value::as_str) {
                            entry.name.push_str(name);
                        }
                        if let Some(args) = func.get("arguments").and_then(Value::as_str) {
                            entry.arguments.push_str(args);
                        }
                    }
                }
            }
        }
    }

    let message = OpenAIMessage {
        role: "assistant".to_string(),
        content: if content.is_empty() {
            None
        } else {
            Some(super::models::OpenAIContent::String(content))
        },
        reasoning_content: if reasoning_content.is_empty() { None } else { Some(reasoning_content) },
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(
                tool_calls
                    .into_iter()
                    .map(|c| ToolCall {
                        id: c.id,
                        r#type: "function".to_string(),
                        function: ToolFunction { name: c.name, arguments: c.arguments },
                    })
                    .collect(),
            )
        },
        tool_call_id: None,
        name: None,
    };

    Ok(OpenAIResponse {
        id,
        object: "chat.completion".to_string(),
        created,
        model,
        choices: vec![Choice { index: 0, message, finish_reason }],
        usage,
    })
}
