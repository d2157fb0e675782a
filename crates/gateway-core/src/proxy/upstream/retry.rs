//! Retry-delay extraction from upstream error bodies.
//!
//! Google's `v1internal` backend reports rate-limit backoff either via a
//! structured `quotaResetDelay` duration string (e.g. `"12.5s"`) nested in the
//! error details, or via free-text phrases in the error message. This mirrors
//! the parsing rules in `rate_limit::parser`, scaled down to milliseconds for
//! the transport-level retry loop.

use regex::Regex;
use std::sync::OnceLock;

static DURATION_SUFFIX_REGEX: OnceLock<Regex> = OnceLock::new();
static RETRY_SECONDS_REGEX: OnceLock<Regex> = OnceLock::new();

fn duration_suffix_regex() -> &'static Regex {
    DURATION_SUFFIX_REGEX
        .get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*s").expect("duration suffix regex valid"))
}

fn retry_seconds_regex() -> &'static Regex {
    RETRY_SECONDS_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(?:try again in|retry after|wait)\s*(\d+)\s*s")
            .expect("retry seconds regex valid")
    })
}

/// Extract a retry delay (in milliseconds) from an upstream error body.
///
/// Returns `None` when no delay hint could be found, letting the caller fall
/// back to its own backoff profile.
pub fn parse_retry_delay(error_text: &str) -> Option<u64> {
    let trimmed = error_text.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(delay_str) = json
                .get("error")
                .and_then(|e| e.get("details"))
                .and_then(|d| d.as_array())
                .and_then(|a| a.first())
                .and_then(|o| o.get("metadata"))
                .and_then(|m| m.get("quotaResetDelay"))
                .and_then(|v| v.as_str())
            {
                if let Some(caps) = duration_suffix_regex().captures(delay_str) {
                    if let Ok(secs) = caps[1].parse::<f64>() {
                        return Some((secs * 1000.0).ceil() as u64);
                    }
                }
            }
        }
    }

    if let Some(caps) = retry_seconds_regex().captures(trimmed) {
        if let Ok(secs) = caps[1].parse::<u64>() {
            return Some(secs.saturating_mul(1000));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quota_reset_delay() {
        let body = r#"{"error":{"details":[{"metadata":{"quotaResetDelay":"3.5s"}}]}}"#;
        assert_eq!(parse_retry_delay(body), Some(3500));
    }

    #[test]
    fn test_parse_free_text_seconds() {
        let body = "rate limited, try again in 10s";
        assert_eq!(parse_retry_delay(body), Some(10_000));
    }

    #[test]
    fn test_parse_unmatched_returns_none() {
        assert_eq!(parse_retry_delay("no hints here"), None);
    }
}
