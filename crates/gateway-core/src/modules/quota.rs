//! Quota fetching against Cloud Code's model-availability endpoint.

use gateway_types::models::QuotaData;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

const CLOUD_CODE_BASE_URL: &str = "https://cloudcode-pa.googleapis.com";
const QUOTA_API_URL: &str = "https://cloudcode-pa.googleapis.com/v1internal:fetchAvailableModels";
const DEFAULT_PROJECT_ID: &str = "bamboo-precept-lgxtn";

fn user_agent() -> String {
    format!("gateway/{} (+https://github.com)", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Serialize, Deserialize)]
struct QuotaResponse {
    #[serde(default)]
    models: HashMap<String, ModelInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelInfo {
    #[serde(rename = "quotaInfo")]
    quota_info: Option<QuotaInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuotaInfo {
    #[serde(rename = "remainingFraction")]
    remaining_fraction: Option<f64>,
    #[serde(rename = "resetTime")]
    reset_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoadProjectResponse {
    #[serde(rename = "cloudaicompanionProject")]
    project_id: Option<String>,
    #[serde(rename = "currentTier")]
    current_tier: Option<Tier>,
    #[serde(rename = "paidTier")]
    paid_tier: Option<Tier>,
}

#[derive(Debug, Deserialize)]
struct Tier {
    id: Option<String>,
}

async fn fetch_project_id(
    client: &reqwest::Client,
    access_token: &str,
    email: &str,
) -> (Option<String>, Option<String>) {
    let meta = json!({"metadata": {"ideType": "IDE_UNSPECIFIED"}});

    let res = client
        .post(format!("{}/v1internal:loadCodeAssist", CLOUD_CODE_BASE_URL))
        .bearer_auth(access_token)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .header(reqwest::header::USER_AGENT, user_agent())
        .json(&meta)
        .send()
        .await;

    match res {
        Ok(res) if res.status().is_success() => match res.json::<LoadProjectResponse>().await {
            Ok(data) => {
                let project_id = data.project_id;
                // Paid tier better reflects actual entitlements than the current tier.
                let subscription_tier = data.paid_tier.and_then(|t| t.id).or_else(|| data.current_tier.and_then(|t| t.id));
                (project_id, subscription_tier)
            }
            Err(e) => {
                tracing::warn!("loadCodeAssist parse error for {}: {}", email, e);
                (None, None)
            }
        },
        Ok(res) => {
            tracing::warn!("loadCodeAssist failed for {}: status {}", email, res.status());
            (None, None)
        }
        Err(e) => {
            tracing::warn!("loadCodeAssist network error for {}: {}", email, e);
            (None, None)
        }
    }
}

/// Fetch current quota and the account's Cloud Code project ID.
///
/// Retries transient failures up to three times; a 403 short-circuits
/// immediately into a `QuotaData` marked `is_forbidden` since that status
/// means the account itself is blocked, not that quota is merely low.
pub async fn fetch_quota(access_token: &str, email: &str) -> Result<(QuotaData, Option<String>), String> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

    let (project_id, subscription_tier) = fetch_project_id(&client, access_token, email).await;
    let payload = json!({ "project": project_id.as_deref().unwrap_or(DEFAULT_PROJECT_ID) });

    let max_retries = 3;
    let mut last_error = String::new();

    for attempt in 1..=max_retries {
        match client.post(QUOTA_API_URL).bearer_auth(access_token).header("User-Agent", user_agent()).json(&payload).send().await {
            Ok(response) => {
                let status = response.status();
                if status == reqwest::StatusCode::FORBIDDEN {
                    let mut quota = QuotaData::new();
                    quota.is_forbidden = true;
                    quota.subscription_tier = subscription_tier;
                    return Ok((quota, project_id));
                }

                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    last_error = format!("HTTP {} - {}", status, text);
                    if attempt < max_retries {
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                        continue;
                    }
                    return Err(last_error);
                }

                let parsed: QuotaResponse = response.json().await.map_err(|e| format!("Failed to parse quota response: {}", e))?;
                let mut quota = QuotaData::new();
                for (name, info) in parsed.models {
                    if let Some(info) = info.quota_info {
                        let percentage = info.remaining_fraction.map(|f| (f * 100.0) as i32).unwrap_or(0);
                        quota.add_model(name, percentage, info.reset_time.unwrap_or_default());
                    }
                }
                quota.subscription_tier = subscription_tier;
                return Ok((quota, project_id));
            }
            Err(e) => {
                last_error = format!("Request failed: {}", e);
                if attempt < max_retries {
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    Err(last_error)
}
