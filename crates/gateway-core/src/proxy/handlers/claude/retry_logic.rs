//! Claude-specific retry strategy, backed by the shared retry profiles.

use crate::proxy::retry::{self, RetryProfile};

pub use crate::proxy::retry::{should_rotate_account, RetryStrategy};

const PROFILE: RetryProfile = RetryProfile::claude();

/// Maximum retry attempts before giving up, capped by pool size at the call site.
pub const MAX_RETRY_ATTEMPTS: usize = retry::MAX_RETRY_ATTEMPTS;

pub fn is_signature_error(error_text: &str) -> bool {
    retry::is_signature_error(error_text, &PROFILE)
}

pub fn determine_retry_strategy(
    status_code: u16,
    error_text: &str,
    retried_without_thinking: bool,
) -> RetryStrategy {
    retry::determine_retry_strategy(status_code, error_text, retried_without_thinking, &PROFILE)
}

pub async fn apply_retry_strategy(
    strategy: RetryStrategy,
    attempt: usize,
    status_code: u16,
    trace_id: &str,
) -> bool {
    retry::apply_retry_strategy(strategy, attempt, status_code, trace_id).await
}
