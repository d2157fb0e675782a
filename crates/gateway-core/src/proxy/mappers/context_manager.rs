//! Rough client-side token estimation, used before the upstream response
//! carries a real `usageMetadata` count.
//!
//! The estimate only needs to be in the right ballpark; [`super::estimation_calibrator`]
//! tracks how far off it tends to be and nudges future estimates accordingly.

use crate::proxy::mappers::claude::content_block::ContentBlock;
use crate::proxy::mappers::claude::{ClaudeRequest, MessageContent, SystemPrompt};

/// Chars-per-token heuristic for English/code mixed content.
const CHARS_PER_TOKEN: usize = 4;

pub struct ContextManager;

impl ContextManager {
    /// Estimates the number of input tokens a request will consume, by
    /// summing the character length of all system, message and tool text
    /// and dividing by a fixed chars-per-token ratio.
    pub fn estimate_token_usage(request: &ClaudeRequest) -> u32 {
        let mut chars = 0usize;

        if let Some(system) = &request.system {
            chars += match system {
                SystemPrompt::String(s) => s.len(),
                SystemPrompt::Array(blocks) => blocks.iter().map(|b| b.text.len()).sum(),
            };
        }

        for message in &request.messages {
            chars += match &message.content {
                MessageContent::String(s) => s.len(),
                MessageContent::Array(blocks) => {
                    blocks.iter().map(Self::content_block_chars).sum()
                },
            };
        }

        if let Some(tools) = &request.tools {
            for tool in tools {
                chars += serde_json::to_string(tool).map(|s| s.len()).unwrap_or(0);
            }
        }

        (chars / CHARS_PER_TOKEN) as u32
    }

    fn content_block_chars(block: &ContentBlock) -> usize {
        match block {
            ContentBlock::Text { text } => text.len(),
            ContentBlock::Thinking { thinking, .. } => thinking.len(),
            ContentBlock::ToolUse { input, .. } | ContentBlock::ServerToolUse { input, .. } => {
                input.to_string().len()
            },
            ContentBlock::ToolResult { content, .. }
            | ContentBlock::WebSearchToolResult { content, .. } => content.to_string().len(),
            ContentBlock::Image { .. } | ContentBlock::Document { .. } => 0,
            ContentBlock::RedactedThinking { data } => data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::mappers::claude::Message;

    #[test]
    fn estimates_nonzero_for_simple_message() {
        let request = ClaudeRequest {
            model: "claude-opus-4-5".to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: MessageContent::String("hello world".to_string()),
            }],
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
        };
        assert!(ContextManager::estimate_token_usage(&request) > 0);
    }
}
