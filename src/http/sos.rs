use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::ApiError;
use super::AppState;
use crate::db::EventFilter;
use crate::error::DispatchError;
use crate::models::dispatch::{
    AlertTrigger, Channel, Coordinates, DispatchOutcome, DispatchResult, RecipientReport,
};
use crate::models::sos_event::{SosEvent, SosStatus, TriggerKind};

#[derive(Debug, Default, Deserialize)]
pub struct SosRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub channel: Option<Channel>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosResponse {
    pub success: bool,
    pub message: String,
    pub contacts_notified: usize,
    pub contacts_attempted: usize,
    pub location_included: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sos_event_id: Option<Uuid>,
    pub recipients: Vec<RecipientReport>,
}

impl SosResponse {
    fn refused() -> Self {
        Self {
            success: false,
            message: "No verified emergency contacts found".to_string(),
            contacts_notified: 0,
            contacts_attempted: 0,
            location_included: false,
            channel: None,
            address: None,
            sos_event_id: None,
            recipients: Vec::new(),
        }
    }

    fn dispatched(kind: TriggerKind, result: DispatchResult) -> Self {
        let label = match kind {
            TriggerKind::Voice => "Voice",
            TriggerKind::Motion => "Motion",
            TriggerKind::Button => "Button",
        };
        let message = if result.contacts_notified > 0 {
            format!(
                "{} SOS alert sent to {} of {} emergency contacts",
                label, result.contacts_notified, result.contacts_attempted
            )
        } else {
            format!(
                "{} SOS alert could not be delivered to any of {} emergency contacts",
                label, result.contacts_attempted
            )
        };
        Self {
            success: result.success,
            message,
            contacts_notified: result.contacts_notified,
            contacts_attempted: result.contacts_attempted,
            location_included: result.location_included,
            channel: Some(result.channel),
            address: result.address,
            sos_event_id: result.sos_event_id,
            recipients: result.recipients,
        }
    }
}

/// `POST /api/sos/{kind}`
pub async fn trigger(
    State(state): State<AppState>,
    user: AuthUser,
    Path(kind): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let kind: TriggerKind = kind.parse()?;
    let request: SosRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SosRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {}", e)))?
    };
    let location = Coordinates::from_parts(request.latitude, request.longitude)?;

    let trigger = AlertTrigger {
        kind,
        user_id: user.id,
        user_name: user.name.clone(),
        location,
        channel: request.channel.unwrap_or_default(),
    };

    // Delivery runs on its own task so a dropped connection cannot abort
    // alerts that are already in flight.
    let dispatcher = state.dispatcher.clone();
    let outcome = tokio::spawn(async move { dispatcher.dispatch(trigger).await })
        .await
        .map_err(|e| {
            error!("Dispatch task failed: {}", e);
            ApiError::Internal(anyhow::anyhow!("dispatch task failed"))
        })??;

    info!(
        "SOS {} for user {}: success={} notified={}",
        kind,
        user.id,
        outcome.success(),
        outcome.contacts_notified()
    );

    let response = match outcome {
        DispatchOutcome::NoVerifiedContacts => {
            (StatusCode::NOT_FOUND, Json(SosResponse::refused())).into_response()
        }
        DispatchOutcome::Dispatched(result) => {
            (StatusCode::OK, Json(SosResponse::dispatched(kind, result))).into_response()
        }
    };
    Ok(response)
}

/// `POST /api/sos/events`: the static events route shadows `{kind}`, so
/// this answers the way any other unknown trigger kind would.
pub async fn reject_events_trigger(_user: AuthUser) -> ApiError {
    DispatchError::UnsupportedTrigger("events".to_string()).into()
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// `GET /api/sos/events`: the caller's own events, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SosEvent>>, ApiError> {
    let filter = EventFilter {
        user_id: Some(user.id),
        limit: query.limit,
        ..Default::default()
    };
    Ok(Json(state.events.list(&filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub status: SosStatus,
    pub notes: Option<String>,
}

/// `PATCH /api/sos/events/{id}`: resolve an event or mark it a false alarm.
pub async fn close_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CloseRequest>,
) -> Result<Json<SosEvent>, ApiError> {
    let not_found = || ApiError::NotFound("SOS event not found".to_string());

    let event = state
        .events
        .find(id)
        .await?
        .filter(|e| e.user_id == user.id)
        .ok_or_else(not_found)?;

    if !event.status.can_transition_to(request.status) {
        return Err(ApiError::Conflict(format!(
            "cannot move SOS event from {} to {}",
            event.status.as_str(),
            request.status.as_str()
        )));
    }

    if !state.events.close(id, request.status, request.notes).await? {
        return Err(ApiError::Conflict("SOS event is no longer active".to_string()));
    }
    info!("SOS event {} marked {}", id, request.status.as_str());

    let updated = state.events.find(id).await?.ok_or_else(not_found)?;
    Ok(Json(updated))
}
