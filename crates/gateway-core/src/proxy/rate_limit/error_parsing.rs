use std::time::{Duration, SystemTime};

use super::parser;
use super::rate_limit_info::{RateLimitInfo, RateLimitKey, RateLimitReason};
use super::tracker::RateLimitTracker;
use super::{ACCOUNT_FORBIDDEN_SECONDS, QUOTA_EXHAUSTED_DEFAULT_SECONDS, RATE_LIMIT_DEFAULT_SECONDS};

impl RateLimitTracker {
    /// Parse rate limit info from error response, per spec.md §4.2's table:
    /// 403 -> AccountForbidden (3600s); 429/QUOTA_EXHAUSTED -> parse
    /// `quotaResetDelay` else 3600s; 429/other -> Retry-After if numeric else
    /// 60s; 503/529/other 5xx -> ServerError (30s).
    pub fn parse_from_error(
        &self,
        account_id: &str,
        status: u16,
        retry_after_header: Option<&str>,
        body: &str,
        model: Option<String>,
    ) -> Option<RateLimitInfo> {
        if status == 403 {
            return Some(self.insert_rate_limit(
                account_id,
                status,
                model,
                RateLimitReason::AccountForbidden,
                ACCOUNT_FORBIDDEN_SECONDS,
            ));
        }

        if status != 429 && status != 500 && status != 503 && status != 529 {
            return None;
        }

        let reason = if status == 429 {
            tracing::warn!("Google 429 Error Body: {}", body);
            self.parse_rate_limit_reason(body)
        } else {
            RateLimitReason::ServerError
        };

        // ModelCapacityExhausted: don't block account, handler will retry
        if reason == RateLimitReason::ModelCapacityExhausted {
            tracing::debug!(
                "MODEL_CAPACITY_EXHAUSTED для {}: НЕ блокируем, handler сделает retry",
                account_id
            );
            return None;
        }

        let retry_sec = match reason {
            RateLimitReason::QuotaExhausted => match parser::parse_retry_time_from_body(body) {
                Some(s) => s.max(2),
                None => {
                    tracing::debug!(
                        "QUOTA_EXHAUSTED without parseable quotaResetDelay, using default {} seconds",
                        QUOTA_EXHAUSTED_DEFAULT_SECONDS
                    );
                    QUOTA_EXHAUSTED_DEFAULT_SECONDS
                }
            },
            RateLimitReason::ServerError => {
                tracing::warn!("Detected 5xx error ({}), applying 30s backoff...", status);
                30
            }
            RateLimitReason::AccountForbidden => {
                unreachable!("AccountForbidden handled by the 403 early return")
            }
            RateLimitReason::ModelCapacityExhausted => {
                unreachable!("ModelCapacityExhausted should be handled by early return")
            }
            RateLimitReason::RateLimitExceeded | RateLimitReason::Unknown => {
                match retry_after_header.and_then(|h| h.parse::<u64>().ok()) {
                    Some(s) => s.max(2),
                    None => {
                        tracing::debug!(
                            "No numeric Retry-After, using default {} seconds",
                            RATE_LIMIT_DEFAULT_SECONDS
                        );
                        RATE_LIMIT_DEFAULT_SECONDS
                    }
                }
            }
        };

        Some(self.insert_rate_limit(account_id, status, model, reason, retry_sec))
    }

    fn insert_rate_limit(
        &self,
        account_id: &str,
        status: u16,
        model: Option<String>,
        reason: RateLimitReason,
        retry_sec: u64,
    ) -> RateLimitInfo {
        let info = RateLimitInfo {
            reset_time: SystemTime::now() + Duration::from_secs(retry_sec),
            retry_after_sec: retry_sec,
            detected_at: SystemTime::now(),
            reason,
            model: model.clone(),
        };

        let key = RateLimitKey::from_optional_model(account_id, model.as_deref());
        self.limits.insert(key, info.clone());

        tracing::warn!(
            "account {} [{}] rate limit type: {:?}, reset delay: {} seconds",
            account_id,
            status,
            reason,
            retry_sec
        );

        info
    }

    /// Parse rate limit reason from response body
    pub fn parse_rate_limit_reason(&self, body: &str) -> RateLimitReason {
        let trimmed = body.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
                if let Some(reason_str) = json
                    .get("error")
                    .and_then(|e| e.get("details"))
                    .and_then(|d| d.as_array())
                    .and_then(|a| a.first())
                    .and_then(|o| o.get("reason"))
                    .and_then(|v| v.as_str())
                {
                    return match reason_str {
                        "QUOTA_EXHAUSTED" => RateLimitReason::QuotaExhausted,
                        "RATE_LIMIT_EXCEEDED" => RateLimitReason::RateLimitExceeded,
                        "MODEL_CAPACITY_EXHAUSTED" => RateLimitReason::ModelCapacityExhausted,
                        _ => RateLimitReason::Unknown,
                    };
                }
                if let Some(msg) = json
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|v| v.as_str())
                {
                    let msg_lower = msg.to_lowercase();
                    if msg_lower.contains("per minute") || msg_lower.contains("rate limit") {
                        return RateLimitReason::RateLimitExceeded;
                    }
                }
            }
        }

        let body_lower = body.to_lowercase();
        if body_lower.contains("per minute")
            || body_lower.contains("rate limit")
            || body_lower.contains("too many requests")
        {
            RateLimitReason::RateLimitExceeded
        } else if body_lower.contains("exhausted") || body_lower.contains("quota") {
            RateLimitReason::QuotaExhausted
        } else {
            RateLimitReason::Unknown
        }
    }
}
