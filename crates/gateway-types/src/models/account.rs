//! Account model and related types.

use super::{QuotaData, TokenData};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Account data structure representing a pooled OAuth account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Email address associated with the account
    pub email: String,
    /// Optional display name
    pub name: Option<String>,
    /// Authentication token data
    pub token: TokenData,
    /// Whether the account is disabled and must be skipped during selection
    #[serde(default)]
    pub disabled: bool,
    /// Reason the account was disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    /// Timestamp when the account was disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_at: Option<i64>,
    /// Excluded from proxy selection for a narrower reason than `disabled`
    /// (e.g. phone verification pending, quota-protection lockout)
    #[serde(default)]
    pub proxy_disabled: bool,
    /// Reason `proxy_disabled` was set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_disabled_reason: Option<String>,
    /// Subscription tier reported by the upstream (FREE/PRO/ULTRA), used to
    /// break ties when several accounts are otherwise equally eligible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_tier: Option<String>,
    /// Most recent quota snapshot for this account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaData>,
    /// Models currently excluded from selection on this account (quota-exhausted)
    #[serde(default)]
    pub protected_models: HashSet<String>,
    /// Timestamp when account was created
    pub created_at: i64,
    /// Timestamp when account was last used
    pub last_used: i64,
}

impl Account {
    /// Create a new account with the given ID, email, and token.
    pub fn new(id: String, email: String, token: TokenData) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            email,
            name: None,
            token,
            disabled: false,
            disabled_reason: None,
            disabled_at: None,
            proxy_disabled: false,
            proxy_disabled_reason: None,
            subscription_tier: None,
            quota: None,
            protected_models: HashSet::new(),
            created_at: now,
            last_used: now,
        }
    }

    /// Update the last used timestamp to now.
    pub fn update_last_used(&mut self) {
        self.last_used = chrono::Utc::now().timestamp();
    }

    /// Check if the account is available for proxy use.
    pub fn is_active(&self) -> bool {
        !self.disabled && !self.proxy_disabled
    }

    /// Disable the account with a reason.
    pub fn disable(&mut self, reason: impl Into<String>) {
        self.disabled = true;
        self.disabled_reason = Some(reason.into());
        self.disabled_at = Some(chrono::Utc::now().timestamp());
    }

    /// Re-enable the account.
    pub fn enable(&mut self) {
        self.disabled = false;
        self.disabled_reason = None;
        self.disabled_at = None;
    }

    /// Exclude the account from proxy selection without touching `disabled`.
    pub fn disable_for_proxy(&mut self, reason: impl Into<String>) {
        self.proxy_disabled = true;
        self.proxy_disabled_reason = Some(reason.into());
    }

    /// Clear a `proxy_disabled` exclusion.
    pub fn enable_for_proxy(&mut self) {
        self.proxy_disabled = false;
        self.proxy_disabled_reason = None;
    }

    /// Record a fresh quota snapshot.
    pub fn update_quota(&mut self, quota: QuotaData) {
        self.subscription_tier = quota.subscription_tier.clone().or_else(|| self.subscription_tier.clone());
        self.quota = Some(quota);
    }

    /// Mark a model as quota-exhausted for this account.
    pub fn protect_model(&mut self, model_id: &str) {
        self.protected_models.insert(model_id.to_string());
    }

    /// Clear a model's quota-exhausted mark once it recovers.
    pub fn unprotect_model(&mut self, model_id: &str) {
        self.protected_models.remove(model_id);
    }

    /// True if selection should skip `model_id` on this account.
    pub fn is_model_protected(&self, model_id: &str) -> bool {
        self.protected_models.contains(model_id)
    }
}

/// Account index data structure (accounts.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountIndex {
    /// Schema version
    pub version: String,
    /// List of account summaries
    pub accounts: Vec<AccountSummary>,
    /// Currently active account ID
    pub current_account_id: Option<String>,
}

impl AccountIndex {
    /// Create a new empty account index.
    pub fn new() -> Self {
        Self { version: "1.0".to_string(), accounts: Vec::new(), current_account_id: None }
    }
}

impl Default for AccountIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Account summary for the index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Unique identifier
    pub id: String,
    /// Email address
    pub email: String,
    /// Optional display name
    pub name: Option<String>,
    /// Creation timestamp
    pub created_at: i64,
    /// Last used timestamp
    pub last_used: i64,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            created_at: account.created_at,
            last_used: account.last_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disable_and_enable_round_trip() {
        let token = TokenData::new("a".into(), "r".into(), 3600, None, None, None);
        let mut account = Account::new("acc-1".into(), "user@example.com".into(), token);
        assert!(account.is_active());

        account.disable("rate limited");
        assert!(!account.is_active());
        assert_eq!(account.disabled_reason.as_deref(), Some("rate limited"));

        account.enable();
        assert!(account.is_active());
        assert!(account.disabled_reason.is_none());
    }
}
