use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Datelike, Days, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::error::ApiError;
use super::AppState;
use crate::db::EventFilter;
use crate::models::contact::ContactSnapshot;
use crate::models::sos_event::{SosEvent, SosStatus, TriggerKind};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

const ADDRESS_UNAVAILABLE: &str = "Address not available";
const UNKNOWN_USER: &str = "Unknown User";
const RECENT_EVENTS: i64 = 10;
const DEFAULT_ACTIVE_HOURS: i64 = 24;
const MAX_ACTIVE_HOURS: i64 = 24 * 366;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEventQuery {
    pub limit: Option<i64>,
    pub user_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveUsersQuery {
    pub hours: Option<i64>,
}

/// An SOS event as shown on the operator dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contacts: Vec<ContactSnapshot>,
    pub user_id: Uuid,
    pub user_name: String,
    pub status: SosStatus,
    pub created_at: DateTime<Utc>,
}

impl AdminEvent {
    fn new(event: SosEvent, user_name: String) -> Self {
        Self {
            id: event.id,
            kind: event.kind,
            address: event
                .address
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| ADDRESS_UNAVAILABLE.to_string()),
            latitude: event.latitude,
            longitude: event.longitude,
            contacts: event.contacts,
            user_id: event.user_id,
            user_name,
            status: event.status,
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    #[serde(rename = "todaySOSCount")]
    pub today: i64,
    #[serde(rename = "weekSOSCount")]
    pub week: i64,
    #[serde(rename = "monthSOSCount")]
    pub month: i64,
    #[serde(rename = "activeUsersCount")]
    pub active_users: usize,
    #[serde(rename = "recentEvents")]
    pub recent_events: Vec<AdminEvent>,
}

/// Cutoffs for the dashboard counters, all in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    pub today: DateTime<Utc>,
    pub week: DateTime<Utc>,
    pub month: DateTime<Utc>,
    pub active: DateTime<Utc>,
}

impl StatsWindow {
    pub fn at(now: DateTime<Utc>) -> Self {
        let date = now.date_naive();
        let today = date.and_time(NaiveTime::MIN).and_utc();
        let month = (date - Days::new(u64::from(date.day0())))
            .and_time(NaiveTime::MIN)
            .and_utc();
        Self {
            today,
            week: today - TimeDelta::days(7),
            month,
            active: now - TimeDelta::hours(DEFAULT_ACTIVE_HOURS),
        }
    }
}

fn authorize(headers: &HeaderMap, configured: &str) -> Result<(), ApiError> {
    if configured.is_empty() {
        return Err(ApiError::Forbidden("Admin API is disabled".to_string()));
    }
    match headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        Some(key) if key == configured => Ok(()),
        _ => Err(ApiError::Unauthorized("Invalid admin key".to_string())),
    }
}

/// Attaches each event's owner name, looking every user up once.
async fn with_user_names(
    state: &AppState,
    events: Vec<SosEvent>,
) -> Result<Vec<AdminEvent>, ApiError> {
    let mut names: HashMap<Uuid, String> = HashMap::new();
    let mut out = Vec::with_capacity(events.len());
    for event in events {
        let name = match names.get(&event.user_id) {
            Some(name) => name.clone(),
            None => {
                let name = state
                    .contacts
                    .find_user(event.user_id)
                    .await?
                    .map(|u| u.name)
                    .unwrap_or_else(|| UNKNOWN_USER.to_string());
                names.insert(event.user_id, name.clone());
                name
            }
        };
        out.push(AdminEvent::new(event, name));
    }
    Ok(out)
}

/// `GET /api/admin/sos-events`
pub async fn list_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminEventQuery>,
) -> Result<Json<Vec<AdminEvent>>, ApiError> {
    authorize(&headers, &state.admin_api_key)?;

    let filter = EventFilter {
        user_id: query.user_id,
        start: query.start,
        end: query.end,
        limit: query.limit,
    };
    let events = state.events.list(&filter).await?;
    Ok(Json(with_user_names(&state, events).await?))
}

/// `GET /api/admin/dashboard-stats`
pub async fn dashboard_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardStats>, ApiError> {
    authorize(&headers, &state.admin_api_key)?;

    let window = StatsWindow::at(Utc::now());
    let today = state.events.count_since(window.today).await?;
    let week = state.events.count_since(window.week).await?;
    let month = state.events.count_since(window.month).await?;
    let active_users = state.events.active_users_since(window.active).await?.len();

    let recent = state
        .events
        .list(&EventFilter {
            limit: Some(RECENT_EVENTS),
            ..Default::default()
        })
        .await?;

    Ok(Json(DashboardStats {
        today,
        week,
        month,
        active_users,
        recent_events: with_user_names(&state, recent).await?,
    }))
}

/// `GET /api/admin/active-users?hours=N`: users who raised an alert in the
/// last `N` hours (24 when absent or not positive).
pub async fn active_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ActiveUsersQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&headers, &state.admin_api_key)?;

    let hours = query
        .hours
        .filter(|h| *h > 0)
        .unwrap_or(DEFAULT_ACTIVE_HOURS)
        .min(MAX_ACTIVE_HOURS);
    let since = Utc::now() - TimeDelta::hours(hours);
    let user_ids = state.events.active_users_since(since).await?;
    Ok(Json(serde_json::json!({ "userIds": user_ids })))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{authed, TestApp, ADMIN_KEY};
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    fn admin_request(uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(key) = key {
            builder = builder.header(ADMIN_KEY_HEADER, key);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_disabled_without_configured_key() {
        let headers = HeaderMap::new();
        assert!(matches!(authorize(&headers, ""), Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_lists_events_across_users() {
        let app = TestApp::new(&[]);
        let asha = app.contacts.add_user("Asha");
        let ravi = app.contacts.add_user("Ravi");
        app.contacts.add_contact(asha, "Meera", "+911111111111", true);
        app.contacts.add_contact(ravi, "Kiran", "+912222222222", true);
        app.call(authed("POST", "/api/sos/button", asha, None)).await;
        app.call(authed("POST", "/api/sos/motion", ravi, None)).await;

        let (status, json) = app
            .call(admin_request("/api/admin/sos-events", Some(ADMIN_KEY)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 2);

        let uri = format!("/api/admin/sos-events?userId={}&limit=10", ravi);
        let (status, json) = app.call(admin_request(&uri, Some(ADMIN_KEY))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["type"], "motion");
        assert_eq!(json[0]["contacts"][0]["name"], "Kiran");
    }

    #[test]
    fn test_stats_window_boundaries() {
        let now = "2026-03-04T15:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let window = StatsWindow::at(now);
        assert_eq!(window.today.to_rfc3339(), "2026-03-04T00:00:00+00:00");
        assert_eq!(window.week.to_rfc3339(), "2026-02-25T00:00:00+00:00");
        assert_eq!(window.month.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(window.active.to_rfc3339(), "2026-03-03T15:30:00+00:00");
    }

    #[tokio::test]
    async fn test_listing_names_users_and_fills_missing_address() {
        let app = TestApp::new(&[]);
        let asha = app.contacts.add_user("Asha");
        app.contacts.add_contact(asha, "Meera", "+911111111111", true);
        app.call(authed("POST", "/api/sos/voice", asha, None)).await;

        let (status, json) = app
            .call(admin_request("/api/admin/sos-events", Some(ADMIN_KEY)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["userName"], "Asha");
        assert_eq!(json[0]["userId"], asha.to_string());
        assert_eq!(json[0]["address"], "Address not available");
        assert_eq!(json[0]["status"], "active");
    }

    #[tokio::test]
    async fn test_dashboard_counts_by_window() {
        let app = TestApp::new(&[]);
        let asha = app.contacts.add_user("Asha");
        let ravi = app.contacts.add_user("Ravi");
        app.contacts.add_contact(asha, "Meera", "+911111111111", true);
        app.contacts.add_contact(ravi, "Kiran", "+912222222222", true);

        let mut ids = Vec::new();
        for (user, kind) in [(asha, "button"), (asha, "voice"), (ravi, "motion"), (ravi, "button")] {
            let uri = format!("/api/sos/{}", kind);
            let (_, json) = app.call(authed("POST", &uri, user, None)).await;
            ids.push(json["sosEventId"].as_str().unwrap().parse::<Uuid>().unwrap());
        }
        let now = Utc::now();
        app.events.backdate(ids[2], now - TimeDelta::days(3));
        app.events.backdate(ids[3], now - TimeDelta::days(40));

        let (status, json) = app
            .call(admin_request("/api/admin/dashboard-stats", Some(ADMIN_KEY)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["todaySOSCount"], 2);
        assert_eq!(json["weekSOSCount"], 3);
        // The three-day-old event may fall in the previous month.
        let month = json["monthSOSCount"].as_i64().unwrap();
        assert!((2..=3).contains(&month));
        assert_eq!(json["activeUsersCount"], 1);

        let recent = json["recentEvents"].as_array().unwrap();
        assert_eq!(recent.len(), 4);
        assert_eq!(recent[0]["userName"], "Asha");
        assert_eq!(recent[3]["id"], ids[3].to_string());
    }

    #[tokio::test]
    async fn test_active_users_window() {
        let app = TestApp::new(&[]);
        let asha = app.contacts.add_user("Asha");
        let ravi = app.contacts.add_user("Ravi");
        app.contacts.add_contact(asha, "Meera", "+911111111111", true);
        app.contacts.add_contact(ravi, "Kiran", "+912222222222", true);
        app.call(authed("POST", "/api/sos/button", asha, None)).await;
        app.call(authed("POST", "/api/sos/button", asha, None)).await;
        let (_, json) = app.call(authed("POST", "/api/sos/button", ravi, None)).await;
        let old = json["sosEventId"].as_str().unwrap().parse::<Uuid>().unwrap();
        app.events.backdate(old, Utc::now() - TimeDelta::hours(30));

        let (status, json) = app
            .call(admin_request("/api/admin/active-users", Some(ADMIN_KEY)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["userIds"], serde_json::json!([asha.to_string()]));

        let (_, json) = app
            .call(admin_request("/api/admin/active-users?hours=48", Some(ADMIN_KEY)))
            .await;
        assert_eq!(json["userIds"].as_array().unwrap().len(), 2);

        let (status, _) = app.call(admin_request("/api/admin/active-users", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_key_is_unauthorized() {
        let app = TestApp::new(&[]);
        let (status, _) = app
            .call(admin_request("/api/admin/sos-events", Some("nope")))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.call(admin_request("/api/admin/sos-events", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
