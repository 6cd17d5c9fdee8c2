use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::{queries, DbPool};
use crate::models::sos_event::{NewSosEvent, SosEvent, SosEventRow, SosStatus};

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub user_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

impl EventFilter {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Append-mostly audit log of SOS dispatches.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: NewSosEvent) -> Result<Uuid>;

    async fn find(&self, id: Uuid) -> Result<Option<SosEvent>>;

    /// Newest first.
    async fn list(&self, filter: &EventFilter) -> Result<Vec<SosEvent>>;

    /// Moves an `active` event to `status`. Returns false if the event is
    /// missing or no longer active.
    async fn close(&self, id: Uuid, status: SosStatus, notes: Option<String>) -> Result<bool>;

    /// Number of events created at or after `since`.
    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Distinct users who raised an event at or after `since`.
    async fn active_users_since(&self, since: DateTime<Utc>) -> Result<Vec<Uuid>>;
}

pub struct PgEventStore {
    pool: DbPool,
}

impl PgEventStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: NewSosEvent) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(queries::INSERT_SOS_EVENT)
            .bind(id)
            .bind(event.user_id)
            .bind(event.kind.as_str())
            .bind(event.latitude)
            .bind(event.longitude)
            .bind(event.address)
            .bind(event.contacts_notified)
            .bind(Json(event.contacts))
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn find(&self, id: Uuid) -> Result<Option<SosEvent>> {
        let row = sqlx::query_as::<_, SosEventRow>(queries::SELECT_SOS_EVENT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(SosEvent::try_from).transpose()
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<SosEvent>> {
        let rows = sqlx::query_as::<_, SosEventRow>(queries::SELECT_SOS_EVENTS)
            .bind(filter.user_id)
            .bind(filter.start)
            .bind(filter.end)
            .bind(filter.effective_limit())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(SosEvent::try_from).collect()
    }

    async fn close(&self, id: Uuid, status: SosStatus, notes: Option<String>) -> Result<bool> {
        let result = sqlx::query(queries::UPDATE_SOS_EVENT_STATUS)
            .bind(id)
            .bind(status.as_str())
            .bind(notes)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(queries::COUNT_SOS_EVENTS_SINCE)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn active_users_since(&self, since: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let users = sqlx::query_scalar::<_, Uuid>(queries::SELECT_ACTIVE_USERS_SINCE)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}
