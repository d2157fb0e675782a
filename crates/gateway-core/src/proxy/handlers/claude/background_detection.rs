//! Claude-specific text extraction feeding the protocol-agnostic
//! background-task detector.

use crate::proxy::common::background_task;
use crate::proxy::mappers::claude::ClaudeRequest;

pub use background_task::{select_background_model, BackgroundTaskType};

const MAX_MESSAGES_CONSIDERED: usize = 3;

pub fn detect_background_task_type(request: &ClaudeRequest) -> Option<BackgroundTaskType> {
    let texts = extract_last_messages_for_detection(request);
    background_task::detect_background_task_type(&texts)
}

fn extract_last_messages_for_detection(request: &ClaudeRequest) -> Vec<String> {
    request
        .messages
        .iter()
        .rev()
        .take(MAX_MESSAGES_CONSIDERED)
        .filter_map(|m| {
            let content = match &m.content {
                crate::proxy::mappers::claude::models::MessageContent::String(s) => s.to_string(),
                crate::proxy::mappers::claude::models::MessageContent::Array(arr) => arr
                    .iter()
                    .filter_map(|block| match block {
                        crate::proxy::mappers::claude::models::ContentBlock::Text { text } => {
                            Some(text.as_str())
                        }
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            };

            if content.trim().is_empty() || content.starts_with("Warmup") {
                None
            } else {
                Some(content)
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::mappers::claude::models::{Message, MessageContent};

    fn user_message(content: &str) -> Message {
        Message { role: "user".to_string(), content: MessageContent::String(content.to_string()) }
    }

    fn test_request(messages: Vec<Message>) -> ClaudeRequest {
        ClaudeRequest {
            model: "claude-3-5-haiku-20241022".to_string(),
            messages,
            system: None,
            tools: None,
            stream: false,
            max_tokens: None,
            temperature: None,
            top_p: None,
            top_k: None,
            thinking: None,
            stop_sequences: None,
            metadata: None,
            output_config: None,
        }
    }

    #[test]
    fn detects_title_request_from_last_message() {
        let request = test_request(vec![user_message(
            "Please write a 3-5 word title for this conversation.",
        )]);

        assert_eq!(
            detect_background_task_type(&request),
            Some(BackgroundTaskType::TitleGeneration)
        );
    }
}
