//! Shrinks oversized or duplicated tool-result payloads before they are
//! folded back into a request, so a chatty tool doesn't blow the context
//! window on its own output.

use serde_json::Value;
use std::collections::HashSet;

/// Hard cap on a single tool result's text length, in characters.
pub const MAX_TOOL_RESULT_CHARS: usize = 200_000;

/// Truncates `text` to `max_chars`, appending a marker so the model knows
/// output was cut off. No-op if already within budget.
pub fn compact_tool_result_text(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text.to_string();
    }
    let suffix = "\n...[truncated output]";
    let suffix_len = suffix.chars().count();
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(suffix_len)).collect();
    truncated.push_str(suffix);
    truncated
}

/// De-duplicates byte-identical blocks (tools sometimes echo the same
/// result twice) and truncates any oversized `text` block in place.
pub fn sanitize_tool_result_blocks(blocks: &mut Vec<Value>) {
    let mut seen = HashSet::new();
    blocks.retain(|block| seen.insert(block.to_string()));

    for block in blocks.iter_mut() {
        if let Some(text) = block.get("text").and_then(Value::as_str) {
            if text.chars().count() > MAX_TOOL_RESULT_CHARS {
                let compacted = compact_tool_result_text(text, MAX_TOOL_RESULT_CHARS);
                if let Some(obj) = block.as_object_mut() {
                    obj.insert("text".to_string(), Value::String(compacted));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compacts_over_budget_text() {
        let text = "a".repeat(100);
        let result = compact_tool_result_text(&text, 50);
        assert!(result.chars().count() <= 50);
        assert!(result.ends_with("[truncated output]"));
    }

    #[test]
    fn leaves_short_text_untouched() {
        assert_eq!(compact_tool_result_text("hi", 50), "hi");
    }

    #[test]
    fn dedupes_identical_blocks() {
        let mut blocks = vec![json!({"type": "text", "text": "dup"}), json!({"type": "text", "text": "dup"})];
        sanitize_tool_result_blocks(&mut blocks);
        assert_eq!(blocks.len(), 1);
    }
}
