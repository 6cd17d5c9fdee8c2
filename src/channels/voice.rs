use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{DeliveryChannel, DeliveryError};
use crate::models::dispatch::{Channel, FailureKind};

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub api_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct CallCreated {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: String,
}

// Twilio error codes for an unusable destination number.
const INVALID_TO_CODES: &[u32] = &[13223, 13224, 21211, 21214, 21217];
// Account-side refusals: auth, suspension, unverified caller, geo permissions, rate limit.
const REJECTED_CODES: &[u32] = &[20003, 20005, 20429, 21210, 21215, 21219];

/// Places a single call whose body is spoken from TwiML.
pub struct TwilioVoiceChannel {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioVoiceChannel {
    pub fn new(config: TwilioConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.api_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

pub fn twiml(script: &str) -> String {
    format!(
        r#"<Response><Say voice="alice" language="en-IN">{}</Say></Response>"#,
        xml_escape(script)
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

fn classify(status: reqwest::StatusCode, code: Option<u32>) -> FailureKind {
    match code {
        Some(c) if INVALID_TO_CODES.contains(&c) => FailureKind::InvalidRecipient,
        Some(c) if REJECTED_CODES.contains(&c) => FailureKind::ProviderRejected,
        _ => DeliveryError::from_status(status).unwrap_or(FailureKind::Unknown),
    }
}

#[async_trait]
impl DeliveryChannel for TwilioVoiceChannel {
    fn channel(&self) -> Channel {
        Channel::Call
    }

    fn recipient_limit(&self) -> Option<usize> {
        Some(1)
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn send(&self, recipient: &str, message: &str) -> Result<String, DeliveryError> {
        let twiml = twiml(message);
        let form = [
            ("To", recipient),
            ("From", self.config.from_number.as_str()),
            ("Twiml", twiml.as_str()),
        ];

        let response = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| DeliveryError::from_transport(&e))?;

        let status = response.status();
        if status.is_success() {
            let created: CallCreated = response
                .json()
                .await
                .map_err(|e| DeliveryError::new(FailureKind::Unknown, e.to_string()))?;
            return Ok(created.sid);
        }

        let body = response
            .text()
            .await
            .map_err(|e| DeliveryError::from_transport(&e))?;
        let (code, message) = match serde_json::from_str::<TwilioError>(&body) {
            Ok(err) => (err.code, err.message),
            Err(_) => (None, body),
        };
        Err(DeliveryError::new(
            classify(status, code),
            format!("twilio {} ({:?}): {}", status.as_u16(), code, message),
        ))
    }
}
