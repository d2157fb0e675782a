//! Request monitoring models.

use serde::{Deserialize, Serialize};

/// Aggregate proxy request statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProxyStats {
    /// Total requests processed
    pub total_requests: u64,
    /// Successful requests
    #[serde(alias = "success_requests")]
    pub success_count: u64,
    /// Failed requests
    #[serde(alias = "failed_requests")]
    pub error_count: u64,
    /// Total input tokens processed
    #[serde(default)]
    pub total_input_tokens: u64,
    /// Total output tokens generated
    #[serde(default)]
    pub total_output_tokens: u64,
}

impl ProxyStats {
    /// Calculate success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 100.0;
        }
        (self.success_count as f64 / self.total_requests as f64) * 100.0
    }
}

/// Individual proxy request log entry, kept in a bounded ring buffer by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyRequestLog {
    /// Unique request ID
    pub id: String,
    /// Request timestamp
    pub timestamp: i64,
    /// HTTP method
    pub method: String,
    /// Request URL/path
    #[serde(alias = "path")]
    pub url: String,
    /// Response status code
    pub status: u16,
    /// Request duration in milliseconds
    #[serde(alias = "duration_ms")]
    pub duration: u64,
    /// Requested model
    pub model: Option<String>,
    /// Model after mapping
    pub mapped_model: Option<String>,
    /// Reason for model mapping
    #[serde(alias = "mapping_reason")]
    pub mapping_reason: Option<String>,
    /// Account email used
    pub account_email: Option<String>,
    /// Error message if failed
    #[serde(alias = "error_message")]
    pub error: Option<String>,
    /// Input tokens used
    pub input_tokens: Option<u32>,
    /// Output tokens generated
    pub output_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_on_empty_stats_is_100() {
        assert_eq!(ProxyStats::default().success_rate(), 100.0);
    }

    #[test]
    fn success_rate_computed_from_counts() {
        let stats = ProxyStats { total_requests: 4, success_count: 3, error_count: 1, ..Default::default() };
        assert_eq!(stats.success_rate(), 75.0);
    }
}
