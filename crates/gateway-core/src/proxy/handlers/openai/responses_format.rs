//! Detects and normalizes OpenAI's `/v1/responses` request shape into the
//! chat-completions shape the rest of the pipeline understands.
//!
//! The Responses API replaces `messages` with `input` (a string or an array
//! of role/content items) and moves the system prompt into a top-level
//! `instructions` field.

use serde_json::{json, Value};

/// True when the body looks like a Responses API request rather than a
/// Chat Completions one.
pub fn is_responses_format(body: &Value) -> bool {
    body.get("input").is_some() && body.get("messages").is_none()
}

/// Rewrites `input`/`instructions` into a `messages` array in place.
pub fn convert_responses_to_chat(body: &mut Value) {
    let Some(obj) = body.as_object_mut() else { return };

    let input = obj.remove("input");
    let instructions = obj.remove("instructions");

    let mut messages = Vec::new();

    if let Some(Value::String(s)) = &instructions {
        messages.push(json!({ "role": "system", "content": s }));
    }

    match input {
        Some(Value::String(s)) => {
            messages.push(json!({ "role": "user", "content": s }));
        },
        Some(Value::Array(items)) => {
            for item in items {
                if let Some(role) = item.get("role").and_then(|v| v.as_str()) {
                    let content = item.get("content").cloned().unwrap_or(Value::Null);
                    messages.push(json!({ "role": role, "content": content }));
                } else {
                    messages.push(json!({ "role": "user", "content": item }));
                }
            }
        },
        _ => {},
    }

    obj.insert("messages".to_string(), Value::Array(messages));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_responses_shape() {
        let body = json!({ "model": "gpt-4", "input": "hi" });
        assert!(is_responses_format(&body));
    }

    #[test]
    fn leaves_chat_shape_alone() {
        let body = json!({ "model": "gpt-4", "messages": [] });
        assert!(!is_responses_format(&body));
    }

    #[test]
    fn converts_string_input_with_instructions() {
        let mut body = json!({
            "model": "gpt-4",
            "instructions": "be terse",
            "input": "what's 2+2?",
        });
        convert_responses_to_chat(&mut body);
        let messages = body.get("messages").unwrap().as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
    }

    #[test]
    fn converts_array_input() {
        let mut body = json!({
            "model": "gpt-4",
            "input": [{ "role": "user", "content": "hello" }],
        });
        convert_responses_to_chat(&mut body);
        let messages = body.get("messages").unwrap().as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }
}
