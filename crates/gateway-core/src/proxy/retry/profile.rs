/// Protocol-specific retry configuration.
///
/// Backoff on 429/503/529/500 follows one universal formula shared by every
/// protocol (see `super::backoff`); only the fixed delay used for
/// signature-recovery retries and 401/403 varies per protocol here.
pub struct RetryProfile {
    pub fixed_401_403_delay_ms: u64,
    pub signature_patterns: &'static [&'static str],
}

const OPENAI_SIGNATURE_PATTERNS: &[&str] = &[
    "Invalid `signature`",
    "thinking.signature",
    "thinking.thinking",
    "Corrupted thought signature",
];

const CLAUDE_SIGNATURE_PATTERNS: &[&str] = &[
    "Invalid `signature`",
    "Invalid signature",
    "thinking.signature",
    "thinking.thinking",
    "thinking.signature: Field required",
    "thinking.thinking: Field required",
    "INVALID_ARGUMENT",
    "Corrupted thought signature",
    "failed to deserialise",
    "thinking block",
    "Found `text`",
    "Found 'text'",
    "must be `thinking`",
    "must be 'thinking'",
];

impl RetryProfile {
    pub const fn openai() -> Self {
        Self { fixed_401_403_delay_ms: 200, signature_patterns: OPENAI_SIGNATURE_PATTERNS }
    }

    pub const fn claude() -> Self {
        Self { fixed_401_403_delay_ms: 100, signature_patterns: CLAUDE_SIGNATURE_PATTERNS }
    }

    pub const fn gemini() -> Self {
        Self { fixed_401_403_delay_ms: 200, signature_patterns: OPENAI_SIGNATURE_PATTERNS }
    }
}
