use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::sos_event::TriggerKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DispatchError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(DispatchError::InvalidLocation(format!(
                "latitude {} out of range",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(DispatchError::InvalidLocation(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// A location is either complete or absent; half a pair is rejected.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, DispatchError> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => Self::new(lat, lng).map(Some),
            (None, None) => Ok(None),
            _ => Err(DispatchError::InvalidLocation(
                "latitude and longitude must be sent together".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Sms,
    Call,
}

/// One alert raised by a user. Not persisted on its own.
#[derive(Debug, Clone)]
pub struct AlertTrigger {
    pub kind: TriggerKind,
    pub user_id: Uuid,
    pub user_name: String,
    pub location: Option<Coordinates>,
    pub channel: Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidRecipient,
    ProviderRejected,
    ProviderUnavailable,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidRecipient => "invalid_recipient",
            FailureKind::ProviderRejected => "provider_rejected",
            FailureKind::ProviderUnavailable => "provider_unavailable",
            FailureKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    #[serde(rename_all = "camelCase")]
    Delivered { provider_id: String },
    Failed { kind: FailureKind, detail: String },
    Skipped,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientReport {
    pub name: String,
    pub phone: String,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub success: bool,
    pub channel: Channel,
    pub contacts_notified: usize,
    pub contacts_attempted: usize,
    pub recipients: Vec<RecipientReport>,
    pub address: Option<String>,
    pub location_included: bool,
    pub sos_event_id: Option<Uuid>,
}

impl DispatchResult {
    pub fn failures(&self) -> impl Iterator<Item = &RecipientReport> {
        self.recipients
            .iter()
            .filter(|r| matches!(r.outcome, DeliveryOutcome::Failed { .. }))
    }
}

#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The user has no verified contacts; nothing was sent or recorded.
    NoVerifiedContacts,
    Dispatched(DispatchResult),
}

impl DispatchOutcome {
    pub fn success(&self) -> bool {
        match self {
            DispatchOutcome::NoVerifiedContacts => false,
            DispatchOutcome::Dispatched(result) => result.success,
        }
    }

    pub fn contacts_notified(&self) -> usize {
        match self {
            DispatchOutcome::NoVerifiedContacts => 0,
            DispatchOutcome::Dispatched(result) => result.contacts_notified,
        }
    }
}
