use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{DeliveryChannel, DeliveryError};
use crate::models::dispatch::{Channel, FailureKind};

#[derive(Debug, Clone)]
pub struct Fast2SmsConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_id: String,
    pub route: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct BulkRequest<'a> {
    route: &'a str,
    sender_id: &'a str,
    message: &'a str,
    language: &'a str,
    flash: u8,
    numbers: &'a str,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(rename = "return", default)]
    accepted: bool,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    message: Value,
}

impl BulkResponse {
    fn message_text(&self) -> String {
        match &self.message {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Fast2SMS bulk API. Each recipient gets its own request so failures are
/// attributable to a single number.
pub struct Fast2SmsChannel {
    client: reqwest::Client,
    config: Fast2SmsConfig,
}

impl Fast2SmsChannel {
    pub fn new(config: Fast2SmsConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

fn classify(status_code: Option<u16>, message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    if lower.contains("number") {
        FailureKind::InvalidRecipient
    } else if lower.contains("balance")
        || lower.contains("authorization")
        || lower.contains("authentication")
        || lower.contains("api key")
        || matches!(status_code, Some(401 | 402 | 412 | 413 | 416))
    {
        FailureKind::ProviderRejected
    } else {
        FailureKind::Unknown
    }
}

#[async_trait]
impl DeliveryChannel for Fast2SmsChannel {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn send(&self, recipient: &str, message: &str) -> Result<String, DeliveryError> {
        let body = BulkRequest {
            route: &self.config.route,
            sender_id: &self.config.sender_id,
            message,
            language: "english",
            flash: 0,
            numbers: recipient,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("authorization", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::from_transport(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DeliveryError::from_transport(&e))?;
        let parsed: Option<BulkResponse> = serde_json::from_str(&text).ok();

        match parsed {
            Some(r) if status.is_success() && r.accepted => {
                Ok(r.request_id.unwrap_or_else(|| "accepted".to_string()))
            }
            Some(r) => {
                let detail = r.message_text();
                let kind = match classify(r.status_code, &detail) {
                    FailureKind::Unknown => {
                        DeliveryError::from_status(status).unwrap_or(FailureKind::Unknown)
                    }
                    kind => kind,
                };
                Err(DeliveryError::new(kind, format!("fast2sms {}: {}", status.as_u16(), detail)))
            }
            None => {
                let kind = DeliveryError::from_status(status).unwrap_or(FailureKind::Unknown);
                Err(DeliveryError::new(
                    kind,
                    format!("fast2sms {}: unexpected response body", status.as_u16()),
                ))
            }
        }
    }
}
