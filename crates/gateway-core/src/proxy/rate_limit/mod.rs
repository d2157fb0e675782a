mod error_parsing;
mod lockout;
mod parser;
mod rate_limit_info;
mod tracker;

pub use rate_limit_info::{RateLimitInfo, RateLimitKey, RateLimitReason};
pub use tracker::RateLimitTracker;

use std::time::Duration;

pub(crate) const FAILURE_COUNT_EXPIRY_SECONDS: u64 = 3600;

/// Fixed cooldown for HTTP 403 (spec.md §4.2: AccountForbidden).
pub(crate) const ACCOUNT_FORBIDDEN_SECONDS: u64 = 3600;

/// Fallback cooldown for 429/QUOTA_EXHAUSTED when no `quotaResetDelay` can be
/// parsed from the error body (spec.md §4.2's table).
const QUOTA_EXHAUSTED_DEFAULT_SECONDS: u64 = 3600;

const RATE_LIMIT_DEFAULT_SECONDS: u64 = 60;

fn duration_to_secs_ceil(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests;
