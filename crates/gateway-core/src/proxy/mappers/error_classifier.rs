//! Classifies a transport-level stream error into a stable error type, a
//! user-facing message, and an i18n key the frontend can translate.

/// Classifies a `reqwest::Error` encountered mid-stream.
///
/// Returns `(error_type, user_message, i18n_key)`.
pub fn classify_stream_error(error: &reqwest::Error) -> (&'static str, &'static str, &'static str) {
    if error.is_timeout() {
        ("timeout", "The upstream request timed out.", "error.stream.timeout")
    } else if error.is_connect() {
        ("connection_error", "Failed to connect to the upstream service.", "error.stream.connect")
    } else if error.is_body() || error.is_decode() {
        ("stream_read_error", "The response stream ended unexpectedly.", "error.stream.read")
    } else {
        ("upstream_error", "An unexpected upstream error occurred.", "error.stream.unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classifies_connect_error() {
        let err = reqwest::Client::new().get("http://127.0.0.1:1").send().await.unwrap_err();
        let (error_type, _, _) = classify_stream_error(&err);
        assert_eq!(error_type, "connection_error");
    }
}
