//! Quota data models.

use serde::{Deserialize, Serialize};

/// Remaining quota for a single model on an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelQuota {
    /// Model name as reported by the upstream quota endpoint
    pub name: String,
    /// Remaining percentage (0-100)
    pub percentage: i32,
    /// Upstream-reported reset time, opaque string
    #[serde(default)]
    pub reset_time: String,
}

/// Aggregated quota snapshot for an account, refreshed periodically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QuotaData {
    /// Per-model quota entries
    #[serde(default)]
    pub models: Vec<ModelQuota>,
    /// Timestamp this snapshot was taken
    #[serde(default)]
    pub last_updated: i64,
    /// Set when the upstream returned 403 Forbidden for the whole account
    #[serde(default)]
    pub is_forbidden: bool,
    /// Subscription tier reported alongside quota (FREE/PRO/ULTRA)
    #[serde(default)]
    pub subscription_tier: Option<String>,
}

impl QuotaData {
    /// Create an empty quota snapshot stamped with the current time.
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
            last_updated: chrono::Utc::now().timestamp(),
            is_forbidden: false,
            subscription_tier: None,
        }
    }

    /// Record a model's remaining quota.
    pub fn add_model(&mut self, name: String, percentage: i32, reset_time: String) {
        self.models.push(ModelQuota { name, percentage, reset_time });
    }

    /// Find quota for a model whose name contains `needle` (case-insensitive).
    pub fn get_model_quota(&self, needle: &str) -> Option<&ModelQuota> {
        let needle = needle.to_lowercase();
        self.models.iter().find(|m| m.name.to_lowercase().contains(&needle))
    }

    /// True if any tracked model has dropped below `threshold` percent.
    pub fn any_below_threshold(&self, threshold: i32) -> bool {
        self.models.iter().any(|m| m.percentage < threshold)
    }

    /// Lowest remaining percentage across all tracked models.
    pub fn min_quota(&self) -> Option<i32> {
        self.models.iter().map(|m| m.percentage).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_and_min_quota() {
        let mut quota = QuotaData::new();
        quota.add_model("claude-sonnet".to_string(), 50, "5h".to_string());
        quota.add_model("gemini-pro".to_string(), 15, "2h".to_string());

        assert!(quota.any_below_threshold(20));
        assert!(!quota.any_below_threshold(10));
        assert_eq!(quota.min_quota(), Some(15));
    }

    #[test]
    fn lookup_by_name_substring() {
        let mut quota = QuotaData::new();
        quota.add_model("gemini-2.5-pro".to_string(), 80, String::new());
        assert!(quota.get_model_quota("2.5-pro").is_some());
        assert!(quota.get_model_quota("flash").is_none());
    }
}
