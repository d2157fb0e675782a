//! Shared success bookkeeping for all protocol handlers.
//!
//! After a successful upstream response, all handlers must update the
//! same tracking systems. This module consolidates that logic.

use crate::proxy::server::AppState;
use crate::proxy::token_manager::TokenManager;
use std::sync::Arc;

/// Records successful request completion: marks the account healthy in
/// the rate-limit registry and clears the session's consecutive-failure
/// counter.
pub fn record_request_success(
    token_manager: &Arc<TokenManager>,
    _state: &AppState,
    email: &str,
    session_id: &str,
) {
    token_manager.mark_account_success(email);
    token_manager.clear_session_failures(session_id);
}
