//! Extracts OpenAI-shaped usage counters from a Gemini `usageMetadata` object.
//!
//! Token usage from streamed chunks is best-effort: not every chunk carries
//! `usageMetadata`, so callers read it opportunistically from whichever one
//! does and keep the latest value seen.

use crate::proxy::mappers::openai::models::{CompletionTokensDetails, OpenAIUsage, PromptTokensDetails};
use serde_json::Value;

/// Converts a Gemini `usageMetadata` value into [`OpenAIUsage`].
/// Returns `None` if the value carries no recognizable counters.
pub fn extract_usage_metadata(usage_metadata: &Value) -> Option<OpenAIUsage> {
    let prompt_tokens = usage_metadata.get("promptTokenCount").and_then(Value::as_u64)? as u32;
    let completion_tokens =
        usage_metadata.get("candidatesTokenCount").and_then(Value::as_u64).unwrap_or(0) as u32;
    let total_tokens = usage_metadata
        .get("totalTokenCount")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(prompt_tokens.saturating_add(completion_tokens));

    let cached_tokens =
        usage_metadata.get("cachedContentTokenCount").and_then(Value::as_u64).map(|v| v as u32);
    let reasoning_tokens =
        usage_metadata.get("thoughtsTokenCount").and_then(Value::as_u64).map(|v| v as u32);

    Some(OpenAIUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
        prompt_tokens_details: cached_tokens.map(|cached_tokens| PromptTokensDetails {
            cached_tokens: Some(cached_tokens),
        }),
        completion_tokens_details: reasoning_tokens.map(|reasoning_tokens| {
            CompletionTokensDetails { reasoning_tokens: Some(reasoning_tokens) }
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_basic_counts() {
        let value = json!({"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15});
        let usage = extract_usage_metadata(&value).unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 5);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn returns_none_without_prompt_count() {
        let value = json!({"candidatesTokenCount": 5});
        assert!(extract_usage_metadata(&value).is_none());
    }
}
