//! The error type tracked across a dispatch loop's retry attempts.
//!
//! Each attempt against an upstream account can fail in one of a few
//! shapes; the last one observed is what gets reported once every
//! account in the pool has been exhausted.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("stream ended with no data")]
    EmptyStream,

    #[error("HTTP {status_code}: {body}")]
    HttpResponse { status_code: u16, body: String },

    #[error("token acquisition failed: {0}")]
    TokenAcquisition(String),
}
