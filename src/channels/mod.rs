//! Outbound delivery channels.

pub mod sms;
pub mod voice;

use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::contact::{is_valid_phone, mask_phone};
use crate::models::dispatch::{Channel, DeliveryOutcome, FailureKind};

/// A classified provider error for a single recipient.
#[derive(Debug, Clone, Error)]
#[error("{}: {}", .kind.as_str(), .detail)]
pub struct DeliveryError {
    pub kind: FailureKind,
    pub detail: String,
}

impl DeliveryError {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn from_transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() {
            FailureKind::ProviderUnavailable
        } else {
            FailureKind::Unknown
        };
        Self::new(kind, err.to_string())
    }

    /// Classification shared by every provider for statuses that carry no
    /// recipient-specific meaning. `None` means the adapter must decide.
    pub fn from_status(status: reqwest::StatusCode) -> Option<FailureKind> {
        match status.as_u16() {
            401 | 402 | 403 | 429 => Some(FailureKind::ProviderRejected),
            408 | 500..=599 => Some(FailureKind::ProviderUnavailable),
            _ => None,
        }
    }
}

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn channel(&self) -> Channel;

    /// Upper bound on recipients per alert. Recipients past it are skipped.
    fn recipient_limit(&self) -> Option<usize> {
        None
    }

    /// Bound on a single provider call.
    fn timeout(&self) -> Duration;

    /// Sends to one recipient, returning the provider's request identifier.
    async fn send(&self, recipient: &str, message: &str) -> Result<String, DeliveryError>;

    /// Sends to every recipient concurrently and joins on all outcomes.
    ///
    /// The returned vector is index-aligned with `recipients`.
    async fn deliver(&self, recipients: &[String], message: &str) -> Vec<DeliveryOutcome> {
        let limit = self.recipient_limit().unwrap_or(recipients.len());
        let timeout = self.timeout();

        let sends = recipients.iter().enumerate().map(|(i, phone)| async move {
            if i >= limit {
                return DeliveryOutcome::Skipped;
            }
            if !is_valid_phone(phone) {
                warn!(
                    "Skipping provider call for malformed number {:?}",
                    mask_phone(phone)
                );
                debug!("Malformed number was {:?}", phone);
                return DeliveryOutcome::Failed {
                    kind: FailureKind::InvalidRecipient,
                    detail: "malformed phone number".to_string(),
                };
            }

            match tokio::time::timeout(timeout, self.send(phone, message)).await {
                Ok(Ok(provider_id)) => {
                    debug!("{:?} delivered to {} ({})", self.channel(), phone, provider_id);
                    DeliveryOutcome::Delivered { provider_id }
                }
                Ok(Err(e)) => {
                    // Provider messages tend to echo the number back.
                    let detail = e.detail.replace(phone.as_str(), &mask_phone(phone));
                    warn!(
                        "{:?} delivery failed: {}: {}",
                        self.channel(),
                        e.kind.as_str(),
                        detail
                    );
                    DeliveryOutcome::Failed {
                        kind: e.kind,
                        detail,
                    }
                }
                Err(_) => {
                    warn!("{:?} delivery timed out after {:?}", self.channel(), timeout);
                    DeliveryOutcome::Failed {
                        kind: FailureKind::ProviderUnavailable,
                        detail: format!("timed out after {}ms", timeout.as_millis()),
                    }
                }
            }
        });

        join_all(sends).await
    }
}
