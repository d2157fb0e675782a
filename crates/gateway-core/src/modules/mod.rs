//! Account persistence, configuration, and OAuth credential refresh.
//!
//! These are the thin on-disk/network edges the token pool manager leans on:
//! loading and saving the account store, refreshing OAuth access tokens, and
//! fetching per-account quota. The store itself is treated as opaque (see
//! the data model in the top-level specification) — this module picks one
//! concrete JSON-file backing for it.

pub mod account;
pub mod config;
pub mod oauth;
pub mod quota;
