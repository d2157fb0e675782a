//! OAuth token refresh against Google's token endpoint.
//!
//! Only the refresh leg lives here — the authorization-code browser flow
//! that mints the first refresh token is a management-surface concern and
//! is not part of the gateway core.

use serde::{Deserialize, Serialize};

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// The OAuth client id/secret pair identifying this gateway to Google. Public
/// installed-app clients ship a secret too (it's not confidential for this
/// client type), but we still prefer an operator-supplied override.
fn client_id() -> String {
    std::env::var("GATEWAY_OAUTH_CLIENT_ID").unwrap_or_else(|_| "gateway-installed-app.apps.googleusercontent.com".to_string())
}

fn client_secret() -> String {
    std::env::var("GATEWAY_OAUTH_CLIENT_SECRET").unwrap_or_default()
}

/// Response body from Google's `/token` endpoint for a refresh-token grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Absent on a refresh response when Google does not rotate the refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'a str,
}

/// Exchange a refresh token for a fresh access token via
/// `grant_type=refresh_token` against the fixed OAuth endpoint. Non-2xx
/// responses surface the upstream error body verbatim so callers can detect
/// `invalid_grant` (revoked/expired refresh token).
pub async fn refresh_access_token(refresh_token: &str) -> Result<TokenResponse, String> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

    let client_id = client_id();
    let client_secret = client_secret();
    let body = RefreshRequest {
        client_id: &client_id,
        client_secret: &client_secret,
        refresh_token,
        grant_type: "refresh_token",
    };

    let response = client
        .post(TOKEN_ENDPOINT)
        .form(&body)
        .send()
        .await
        .map_err(|e| format!("Token refresh request failed: {}", e))?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(format!("Token refresh failed ({}): {}", status.as_u16(), text));
    }

    serde_json::from_str(&text).map_err(|e| format!("Failed to parse token response: {} ({})", e, text))
}
