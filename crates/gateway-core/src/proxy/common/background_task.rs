//! Protocol-agnostic detection of low-value "background" requests (title
//! generation, history compression, prompt suggestions, ...) that clients
//! send on the side of the real conversation. These are downgraded to a
//! cheaper model regardless of which wire protocol carried them.

use regex::Regex;
use std::sync::OnceLock;

const BACKGROUND_MODEL_LITE: &str = "gemini-2.5-flash-lite";
const BACKGROUND_MODEL_STANDARD: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundTaskType {
    TitleGeneration,
    SimpleSummary,
    ContextCompression,
    PromptSuggestion,
    SystemMessage,
    EnvironmentProbe,
}

const TITLE_KEYWORDS: &[&str] = &[
    "Respond with the title",
    "Generate a title for",
    "Create a brief title",
    "title for the conversation",
    "conversation title",
    "generate title",
    "give conversation a title",
];

static TITLE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Matches phrasing like "write a 5-10 word title" or the literal
/// "write a 3-5 word title for this conversation" regardless of the exact
/// word-count range a client happens to ask for.
fn title_regex() -> &'static Regex {
    TITLE_REGEX.get_or_init(|| {
        Regex::new(r"(?i)write a \d+-\d+ word title").expect("title regex is valid")
    })
}

const SUMMARY_KEYWORDS: &[&str] = &[
    "Summarize this coding conversation",
    "Summarize the conversation",
    "Concise summary",
    "in under 50 characters",
    "compress the context",
    "Provide a concise summary",
    "condense the previous messages",
    "shorten the conversation history",
    "extract key points from",
];

const SUGGESTION_KEYWORDS: &[&str] = &[
    "prompt suggestion generator",
    "suggest next prompts",
    "what should I ask next",
    "generate follow-up questions",
    "recommend next steps",
    "possible next actions",
];

const SYSTEM_KEYWORDS: &[&str] = &["Warmup", "<system-reminder>", "This is a system message"];

const PROBE_KEYWORDS: &[&str] =
    &["check current directory", "list available tools", "verify environment", "test connection"];

/// Phrases that indicate a genuine user request even if it happens to
/// overlap with one of the keyword lists above (e.g. "summarize" used in a
/// real coding question rather than a housekeeping task).
const NEGATION_KEYWORDS: &[&str] = &[
    "detailed",
    "implement",
    "debug",
    "refactor",
    "fix the bug",
    "write code",
    "explain in depth",
];

/// Detect whether the most recent conversation turns are a background
/// housekeeping task rather than a real user request. `texts` should be the
/// last few message bodies (any role), most recent last.
pub fn detect_background_task_type(texts: &[String]) -> Option<BackgroundTaskType> {
    let last = texts.last()?;
    if last.trim().is_empty() {
        return None;
    }
    if last.len() > 800 {
        return None;
    }

    let preview = last.chars().take(500).collect::<String>();

    if matches_keywords(&preview, NEGATION_KEYWORDS) {
        return None;
    }

    if matches_keywords(&preview, SYSTEM_KEYWORDS) {
        return Some(BackgroundTaskType::SystemMessage);
    }

    if matches_keywords(&preview, TITLE_KEYWORDS) || title_regex().is_match(&preview) {
        return Some(BackgroundTaskType::TitleGeneration);
    }

    if matches_keywords(&preview, SUMMARY_KEYWORDS) {
        if preview.contains("in under 50 characters") {
            return Some(BackgroundTaskType::SimpleSummary);
        }
        return Some(BackgroundTaskType::ContextCompression);
    }

    if matches_keywords(&preview, SUGGESTION_KEYWORDS) {
        return Some(BackgroundTaskType::PromptSuggestion);
    }

    if matches_keywords(&preview, PROBE_KEYWORDS) {
        return Some(BackgroundTaskType::EnvironmentProbe);
    }

    None
}

fn matches_keywords(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

pub fn select_background_model(task_type: BackgroundTaskType) -> &'static str {
    match task_type {
        BackgroundTaskType::TitleGeneration => BACKGROUND_MODEL_LITE,
        BackgroundTaskType::SimpleSummary => BACKGROUND_MODEL_LITE,
        BackgroundTaskType::SystemMessage => BACKGROUND_MODEL_LITE,
        BackgroundTaskType::PromptSuggestion => BACKGROUND_MODEL_LITE,
        BackgroundTaskType::EnvironmentProbe => BACKGROUND_MODEL_LITE,
        BackgroundTaskType::ContextCompression => BACKGROUND_MODEL_STANDARD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_literal_s6_title_phrasing() {
        let texts = vec!["Please write a 3-5 word title for this conversation.".to_string()];
        assert_eq!(detect_background_task_type(&texts), Some(BackgroundTaskType::TitleGeneration));
    }

    #[test]
    fn detects_five_to_ten_word_title_phrasing() {
        let texts = vec!["Please write a 5-10 word title for this conversation.".to_string()];
        assert_eq!(detect_background_task_type(&texts), Some(BackgroundTaskType::TitleGeneration));
    }

    #[test]
    fn negation_keyword_blocks_false_positive() {
        let texts =
            vec!["Please write a detailed implementation summarizing the conversation".to_string()];
        assert_eq!(detect_background_task_type(&texts), None);
    }

    #[test]
    fn empty_message_is_not_background() {
        let texts = vec!["".to_string()];
        assert_eq!(detect_background_task_type(&texts), None);
    }

    #[test]
    fn real_question_is_not_background() {
        let texts = vec!["How do I fix this null pointer exception in my Rust code?".to_string()];
        assert_eq!(detect_background_task_type(&texts), None);
    }
}
