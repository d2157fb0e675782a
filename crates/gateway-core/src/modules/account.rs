//! File-backed account store: the pooled accounts the token manager draws from.
//!
//! Each account lives in its own `<id>.json` file under the accounts
//! directory, with a small `accounts.json` index tracking the set of IDs and
//! which one is "current" for single-account admin operations. The schema is
//! intentionally simple JSON, not a database — the token pool manager reads
//! these files directly (see the proxy's token manager) so this module's
//! job is mostly CRUD plus the bookkeeping that keeps the index consistent.

use gateway_types::models::{Account, AccountIndex, AccountSummary, QuotaData, TokenData};
use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::sync::OnceLock;
use uuid::Uuid;

const DATA_DIR: &str = ".gateway";
const ACCOUNTS_INDEX: &str = "accounts.json";
const ACCOUNTS_DIR: &str = "accounts";

fn index_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Resolve the data directory, honoring `GATEWAY_DATA_DIR` for containerized
/// deployments and falling back to `~/.gateway` for local/desktop usage.
pub fn get_data_dir() -> Result<std::path::PathBuf, String> {
    let data_dir = if let Ok(custom) = std::env::var("GATEWAY_DATA_DIR") {
        std::path::PathBuf::from(custom)
    } else {
        let home = dirs::home_dir().ok_or("Cannot determine home directory")?;
        home.join(DATA_DIR)
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).map_err(|e| format!("Failed to create data directory: {}", e))?;
    }
    Ok(data_dir)
}

/// Resolve the accounts subdirectory, creating it if missing.
pub fn get_accounts_dir() -> Result<std::path::PathBuf, String> {
    let accounts_dir = get_data_dir()?.join(ACCOUNTS_DIR);
    if !accounts_dir.exists() {
        fs::create_dir_all(&accounts_dir).map_err(|e| format!("Failed to create accounts directory: {}", e))?;
    }
    Ok(accounts_dir)
}

fn load_account_index() -> Result<AccountIndex, String> {
    let index_path = get_data_dir()?.join(ACCOUNTS_INDEX);
    if !index_path.exists() {
        return Ok(AccountIndex::new());
    }

    let content = fs::read_to_string(&index_path).map_err(|e| format!("Failed to read account index: {}", e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse account index: {}", e))
}

fn save_account_index(index: &AccountIndex) -> Result<(), String> {
    let data_dir = get_data_dir()?;
    let index_path = data_dir.join(ACCOUNTS_INDEX);
    let temp_path = data_dir.join(format!("{}.tmp", ACCOUNTS_INDEX));

    let content = serde_json::to_string_pretty(index).map_err(|e| format!("Failed to serialize account index: {}", e))?;
    fs::write(&temp_path, &content).map_err(|e| format!("Failed to write temp index file: {}", e))?;
    fs::rename(&temp_path, &index_path).map_err(|e| format!("Failed to replace index file: {}", e))
}

/// Load a single account by ID.
pub fn load_account(account_id: &str) -> Result<Account, String> {
    let account_path = get_accounts_dir()?.join(format!("{}.json", account_id));
    if !account_path.exists() {
        return Err(format!("Account not found: {}", account_id));
    }

    let content = fs::read_to_string(&account_path).map_err(|e| format!("Failed to read account data: {}", e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse account data: {}", e))
}

/// Save a single account atomically (write to a temp file, then rename).
pub fn save_account(account: &Account) -> Result<(), String> {
    let accounts_dir = get_accounts_dir()?;
    let account_path = accounts_dir.join(format!("{}.json", account.id));
    let temp_path = accounts_dir.join(format!("{}.json.tmp", account.id));

    let content = serde_json::to_string_pretty(account).map_err(|e| format!("Failed to serialize account data: {}", e))?;
    if let Err(e) = fs::write(&temp_path, content) {
        let _ = fs::remove_file(&temp_path);
        return Err(format!("Failed to write temp account file: {}", e));
    }
    fs::rename(&temp_path, &account_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        format!("Failed to replace account file: {}", e)
    })
}

/// List every account known to the index, dropping (and cleaning up the
/// index for) entries whose backing file is missing or unparseable.
pub fn list_accounts() -> Result<Vec<Account>, String> {
    let mut index = load_account_index()?;
    let mut accounts = Vec::new();
    let mut invalid_ids = Vec::new();

    for summary in &index.accounts {
        match load_account(&summary.id) {
            Ok(account) => accounts.push(account),
            Err(e) => {
                tracing::warn!("Failed to load account {}: {}", summary.id, e);
                invalid_ids.push(summary.id.clone());
            }
        }
    }

    if !invalid_ids.is_empty() {
        index.accounts.retain(|s| !invalid_ids.contains(&s.id));
        if let Some(current) = &index.current_account_id {
            if invalid_ids.contains(current) {
                index.current_account_id = index.accounts.first().map(|s| s.id.clone());
            }
        }
        if let Err(e) = save_account_index(&index) {
            tracing::warn!("Failed to save cleaned account index: {}", e);
        }
    }

    Ok(accounts)
}

/// Add a new account, failing if the email is already registered.
pub fn add_account(email: String, name: Option<String>, token: TokenData) -> Result<Account, String> {
    let _lock = index_lock().lock().map_err(|e| format!("Lock error: {}", e))?;
    let mut index = load_account_index()?;

    if index.accounts.iter().any(|s| s.email == email) {
        return Err(format!("Account already exists: {}", email));
    }

    let account_id = Uuid::new_v4().to_string();
    let mut account = Account::new(account_id.clone(), email.clone(), token);
    account.name = name.clone();
    save_account(&account)?;

    index.accounts.push(AccountSummary::from(&account));
    if index.current_account_id.is_none() {
        index.current_account_id = Some(account_id);
    }
    save_account_index(&index)?;

    Ok(account)
}

/// Add an account, or refresh its token/name in place if the email already
/// exists. Re-enables a previously-disabled account when its credentials
/// actually changed (a fresh OAuth grant supersedes a stale `invalid_grant`).
pub fn upsert_account(email: String, name: Option<String>, token: TokenData) -> Result<Account, String> {
    let _lock = index_lock().lock().map_err(|e| format!("Lock error: {}", e))?;
    let mut index = load_account_index()?;

    let existing_id = index.accounts.iter().find(|s| s.email == email).map(|s| s.id.clone());

    let Some(account_id) = existing_id else {
        drop(_lock);
        return add_account(email, name, token);
    };

    let mut account = match load_account(&account_id) {
        Ok(account) => account,
        Err(e) => {
            tracing::warn!("Account {} file missing ({}), recreating", account_id, e);
            let mut fresh = Account::new(account_id.clone(), email.clone(), token);
            fresh.name = name.clone();
            save_account(&fresh)?;
            if let Some(summary) = index.accounts.iter_mut().find(|s| s.id == account_id) {
                summary.name = name;
                save_account_index(&index)?;
            }
            return Ok(fresh);
        }
    };

    let old_access = account.token.access_token.clone();
    let old_refresh = account.token.refresh_token.clone();
    account.token = token;
    account.name = name.clone();

    if account.disabled && (account.token.refresh_token != old_refresh || account.token.access_token != old_access) {
        account.enable();
    }
    account.update_last_used();
    save_account(&account)?;

    if let Some(summary) = index.accounts.iter_mut().find(|s| s.id == account_id) {
        summary.name = name;
        save_account_index(&index)?;
    }

    Ok(account)
}

/// Delete a single account's file and index entry.
pub fn delete_account(account_id: &str) -> Result<(), String> {
    let _lock = index_lock().lock().map_err(|e| format!("Lock error: {}", e))?;
    let mut index = load_account_index()?;

    let before = index.accounts.len();
    index.accounts.retain(|s| s.id != account_id);
    if index.accounts.len() == before {
        return Err(format!("Account not found: {}", account_id));
    }
    if index.current_account_id.as_deref() == Some(account_id) {
        index.current_account_id = index.accounts.first().map(|s| s.id.clone());
    }
    save_account_index(&index)?;

    let account_path = get_accounts_dir()?.join(format!("{}.json", account_id));
    if account_path.exists() {
        fs::remove_file(&account_path).map_err(|e| format!("Failed to delete account file: {}", e))?;
    }
    Ok(())
}

/// Delete several accounts in one index update.
pub fn delete_accounts(account_ids: &[String]) -> Result<(), String> {
    let _lock = index_lock().lock().map_err(|e| format!("Lock error: {}", e))?;
    let mut index = load_account_index()?;
    let accounts_dir = get_accounts_dir()?;

    for account_id in account_ids {
        index.accounts.retain(|s| &s.id != account_id);
        if index.current_account_id.as_deref() == Some(account_id.as_str()) {
            index.current_account_id = None;
        }
        let account_path = accounts_dir.join(format!("{}.json", account_id));
        if account_path.exists() {
            let _ = fs::remove_file(&account_path);
        }
    }

    if index.current_account_id.is_none() {
        index.current_account_id = index.accounts.first().map(|s| s.id.clone());
    }
    save_account_index(&index)
}

/// Get the currently selected account ID, if any.
pub fn get_current_account_id() -> Result<Option<String>, String> {
    Ok(load_account_index()?.current_account_id)
}

/// Get the currently selected account, if any.
pub fn get_current_account() -> Result<Option<Account>, String> {
    match get_current_account_id()? {
        Some(id) => Ok(Some(load_account(&id)?)),
        None => Ok(None),
    }
}

/// Mark `account_id` as the current account (used by single-account admin
/// flows; the proxy's pool selection ignores this and scores every account).
pub fn switch_account(account_id: &str) -> Result<(), String> {
    let _lock = index_lock().lock().map_err(|e| format!("Lock error: {}", e))?;
    let mut index = load_account_index()?;
    if !index.accounts.iter().any(|s| s.id == account_id) {
        return Err(format!("Account not found: {}", account_id));
    }
    index.current_account_id = Some(account_id.to_string());
    save_account_index(&index)
}

/// Mark an account as needing phone verification, keyed by email since the
/// caller (the dispatcher, reacting to an upstream `SERVICE_DISABLED`/
/// `CONSUMER_INVALID` error) only has the account's email on hand.
pub async fn mark_needs_verification_by_email(email: &str) -> Result<(), String> {
    let index = load_account_index()?;
    let account_id = index
        .accounts
        .iter()
        .find(|acc| acc.email == email)
        .map(|acc| acc.id.clone())
        .ok_or_else(|| format!("Account not found: {}", email))?;

    tokio::task::spawn_blocking(move || {
        let mut account = load_account(&account_id)?;
        if !account.proxy_disabled || account.proxy_disabled_reason.as_deref() != Some("phone_verification_required") {
            account.disable_for_proxy("phone_verification_required");
            save_account(&account)?;
            tracing::warn!("Account {} marked as needing phone verification", account.email);
        }
        Ok(())
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?
}

/// Apply a freshly-fetched quota snapshot, updating per-model protection per
/// the gateway's quota protection policy (see `modules::config`).
pub fn update_account_quota(account_id: &str, quota: QuotaData) -> Result<Account, String> {
    let _lock = index_lock().lock().map_err(|e| format!("Lock error: {}", e))?;
    let mut account = load_account(account_id)?;
    account.update_quota(quota.clone());

    if let Ok(config) = super::config::load_config() {
        if config.quota_protection.enabled {
            let threshold = i32::from(config.quota_protection.threshold_percentage);

            if quota.is_forbidden {
                for model_id in &config.quota_protection.monitored_models {
                    account.protect_model(model_id);
                }
            } else {
                for model in &quota.models {
                    if !config.quota_protection.monitored_models.contains(&model.name) {
                        continue;
                    }
                    if model.percentage <= threshold {
                        account.protect_model(&model.name);
                    } else if config.quota_protection.auto_restore {
                        account.unprotect_model(&model.name);
                    }
                }
            }

            if account.proxy_disabled && account.proxy_disabled_reason.as_deref() == Some("quota_protection") {
                account.enable_for_proxy();
            }
        }
    }

    save_account(&account)?;
    Ok(account)
}

/// Async wrapper around [`update_account_quota`] for callers already on the
/// tokio runtime (file I/O runs on the blocking pool).
pub async fn update_account_quota_async(account_id: String, quota: QuotaData) -> Result<Account, String> {
    tokio::task::spawn_blocking(move || update_account_quota(&account_id, quota))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
}

/// Refresh an account's OAuth token if needed, then fetch and persist its
/// current quota. Disables the account on `invalid_grant` (revoked token)
/// so the pool stops retrying a dead credential.
pub async fn fetch_quota_with_retry(account: &mut Account) -> Result<QuotaData, String> {
    use super::oauth;

    if account.token.is_expired() || account.token.expires_within(120) {
        match oauth::refresh_access_token(&account.token.refresh_token).await {
            Ok(resp) => {
                account.token = TokenData::new(
                    resp.access_token,
                    resp.refresh_token.unwrap_or_else(|| account.token.refresh_token.clone()),
                    resp.expires_in,
                    account.token.email.clone(),
                    account.token.project_id.clone(),
                    account.token.session_id.clone(),
                );
            }
            Err(e) => {
                if e.contains("invalid_grant") {
                    tracing::error!("Disabling account {} due to invalid_grant", account.email);
                    account.disable(format!("invalid_grant: {}", e));
                    let _ = save_account(account);
                }
                return Err(e);
            }
        }
    }

    let (quota, project_id) = super::quota::fetch_quota(&account.token.access_token, &account.email).await?;

    account.update_quota(quota.clone());
    if project_id.is_some() {
        account.token.project_id = project_id;
    }
    save_account(account)?;

    Ok(quota)
}

/// Summaries for every account, without loading full token data.
pub fn list_account_summaries() -> Result<HashMap<String, AccountSummary>, String> {
    let index = load_account_index()?;
    Ok(index.accounts.into_iter().map(|s| (s.id.clone(), s)).collect())
}
