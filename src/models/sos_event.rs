use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::contact::ContactSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Voice,
    Motion,
    Button,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Voice => "voice",
            TriggerKind::Motion => "motion",
            TriggerKind::Button => "button",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(TriggerKind::Voice),
            "motion" => Ok(TriggerKind::Motion),
            "button" => Ok(TriggerKind::Button),
            other => Err(DispatchError::UnsupportedTrigger(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SosStatus {
    Active,
    Resolved,
    FalseAlarm,
}

impl SosStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SosStatus::Active => "active",
            SosStatus::Resolved => "resolved",
            SosStatus::FalseAlarm => "false_alarm",
        }
    }

    /// Events only ever leave `active`, and never return to it.
    pub fn can_transition_to(&self, next: SosStatus) -> bool {
        matches!(
            (self, next),
            (SosStatus::Active, SosStatus::Resolved) | (SosStatus::Active, SosStatus::FalseAlarm)
        )
    }
}

impl FromStr for SosStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SosStatus::Active),
            "resolved" => Ok(SosStatus::Resolved),
            "false_alarm" => Ok(SosStatus::FalseAlarm),
            other => Err(anyhow::anyhow!("unknown SOS status '{}'", other)),
        }
    }
}

/// Record appended to the event store after delivery.
#[derive(Debug, Clone)]
pub struct NewSosEvent {
    pub user_id: Uuid,
    pub kind: TriggerKind,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub contacts_notified: i32,
    pub contacts: Vec<ContactSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub contacts_notified: i32,
    pub contacts: Vec<ContactSnapshot>,
    pub status: SosStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// DDL: enum columns are read back as text
#[derive(Debug, FromRow)]
pub struct SosEventRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub contacts_notified: i32,
    pub contacts_data: Option<Json<Vec<ContactSnapshot>>>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SosEventRow> for SosEvent {
    type Error = anyhow::Error;

    fn try_from(row: SosEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse()?,
            latitude: row.latitude,
            longitude: row.longitude,
            address: row.address,
            contacts_notified: row.contacts_notified,
            contacts: row.contacts_data.map(|j| j.0).unwrap_or_default(),
            status: row.status.parse()?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}
