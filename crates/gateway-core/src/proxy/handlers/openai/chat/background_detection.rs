//! OpenAI-specific text extraction feeding the protocol-agnostic
//! background-task detector.

use crate::proxy::common::background_task;
use crate::proxy::mappers::openai::models::{OpenAIContent, OpenAIContentBlock, OpenAIRequest};

pub use background_task::{select_background_model, BackgroundTaskType};

const MAX_MESSAGES_CONSIDERED: usize = 3;

pub fn detect_background_task_type(request: &OpenAIRequest) -> Option<BackgroundTaskType> {
    let texts = extract_last_messages_for_detection(request);
    background_task::detect_background_task_type(&texts)
}

fn extract_last_messages_for_detection(request: &OpenAIRequest) -> Vec<String> {
    request
        .messages
        .iter()
        .rev()
        .take(MAX_MESSAGES_CONSIDERED)
        .filter_map(|m| {
            let content = match &m.content {
                Some(OpenAIContent::String(s)) => s.clone(),
                Some(OpenAIContent::Array(blocks)) => blocks
                    .iter()
                    .filter_map(|block| match block {
                        OpenAIContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
                None => String::new(),
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
