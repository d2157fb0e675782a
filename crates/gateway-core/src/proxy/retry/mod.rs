//! Unified retry strategy for all protocol handlers.
//!
//! Provides protocol-specific backoff profiles (OpenAI, Claude, Gemini)
//! with a single `determine_retry_strategy()` entry point.

mod backoff;
mod error_extraction;
mod exhaustion_response;
mod peek;
mod profile;
mod success_bookkeeping;

pub use backoff::{backoff_duration, BASE_MS as BACKOFF_BASE_MS, MAX_MS as BACKOFF_MAX_MS};
pub use error_extraction::{extract_error_info, ErrorInfo};
pub use exhaustion_response::build_exhaustion_response;
pub use peek::{peek_first_data_chunk, PeekConfig, PeekResult};
pub use profile::RetryProfile;
pub use success_bookkeeping::record_request_success;

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Maximum retry attempts before giving up: spec.md §4.7 step 4,
/// `attempts = min(3, max(1, poolSize))`. Callers combine this with the pool
/// size via `MAX_RETRY_ATTEMPTS.min(pool_size).max(1)`.
pub const MAX_RETRY_ATTEMPTS: usize = 3;

/// HTTP status codes that warrant rotating to a different account.
pub const ROTATABLE_STATUS_CODES: &[u16] = &[429, 401, 403, 404, 500, 503, 529];

/// HTTP status codes indicating rate limiting (subset used for mark_rate_limited).
pub const RATE_LIMIT_CODES: &[u16] = &[429, 529, 503, 500];

/// Delay to prevent thundering herd when all accounts are temporarily limited.
pub const THUNDERING_HERD_DELAY: Duration = Duration::from_millis(500);

/// Strategy for retrying failed upstream requests.
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Do not retry.
    NoRetry,
    /// Retry after a fixed delay.
    FixedDelay(Duration),
    /// Retry following the universal `backoff(attempt)` formula.
    ExponentialBackoff,
}

/// Checks whether the error text matches a known signature/thinking error.
#[inline]
pub fn is_signature_error(error_text: &str, profile: &RetryProfile) -> bool {
    profile.signature_patterns.iter().any(|p| error_text.contains(p))
}

/// Determines the appropriate retry strategy based on status code and profile.
pub fn determine_retry_strategy(
    status_code: u16,
    error_text: &str,
    retried_without_thinking: bool,
    profile: &RetryProfile,
) -> RetryStrategy {
    match status_code {
        400 if !retried_without_thinking && is_signature_error(error_text, profile) => {
            RetryStrategy::FixedDelay(Duration::from_millis(profile.fixed_401_403_delay_ms))
        },
        429 => {
            if let Some(delay_ms) = crate::proxy::upstream::retry::parse_retry_delay(error_text) {
                let actual_delay = delay_ms.saturating_add(200).min(backoff::MAX_MS);
                RetryStrategy::FixedDelay(Duration::from_millis(actual_delay))
            } else {
                RetryStrategy::ExponentialBackoff
            }
        },
        503 | 529 | 500 => RetryStrategy::ExponentialBackoff,
        // spec.md §7: Unauthorized (401) and Forbidden (403) are not retryable.
        401 | 403 => RetryStrategy::NoRetry,
        // spec.md §7: NotFound (404) is not retryable.
        404 => RetryStrategy::NoRetry,
        _ => RetryStrategy::NoRetry,
    }
}

/// Applies the retry strategy, sleeping the appropriate duration.
///
/// Returns `true` if retry should proceed, `false` if we should stop.
pub async fn apply_retry_strategy(
    strategy: RetryStrategy,
    attempt: usize,
    status_code: u16,
    trace_id: &str,
) -> bool {
    match strategy {
        RetryStrategy::NoRetry => {
            debug!("[{}] Non-retryable error {}, stopping", trace_id, status_code);
            false
        },
        RetryStrategy::FixedDelay(duration) => {
            let base_ms = duration.as_millis() as u64;
            info!(
                "[{}] Retry with fixed delay: status={}, attempt={}/{}, delay={}ms",
                trace_id,
                status_code,
                attempt + 1,
                MAX_RETRY_ATTEMPTS,
                base_ms
            );
            sleep(duration).await;
            true
        },
        RetryStrategy::ExponentialBackoff => {
            let delay = backoff::backoff_duration(attempt as u32);
            info!(
                "[{}] Retry with exponential backoff: status={}, attempt={}/{}, delay={}ms",
                trace_id,
                status_code,
                attempt + 1,
                MAX_RETRY_ATTEMPTS,
                delay.as_millis()
            );
            sleep(delay).await;
            true
        },
    }
}

/// Checks if the status code warrants rotating to a different account.
///
/// Includes 503/529 (the bug fix: OpenAI handler previously missed these).
pub fn should_rotate_account(status_code: u16) -> bool {
    ROTATABLE_STATUS_CODES.contains(&status_code)
}

/// Checks if the status code indicates a rate-limiting condition.
pub fn is_rate_limit_code(status_code: u16) -> bool {
    RATE_LIMIT_CODES.contains(&status_code)
}
