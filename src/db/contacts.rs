use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::{queries, DbPool};
use crate::models::contact::{EmergencyContact, UserIdentity};

/// Read access to users and their emergency contacts.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Verified contacts in creation order. An empty vector is not an error.
    async fn verified_contacts(&self, user_id: Uuid) -> Result<Vec<EmergencyContact>>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserIdentity>>;

    /// Marks the user's contacts with this phone as verified, returning how
    /// many rows changed.
    async fn mark_verified(&self, user_id: Uuid, phone: &str) -> Result<u64>;
}

pub struct PgContactStore {
    pool: DbPool,
}

impl PgContactStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn verified_contacts(&self, user_id: Uuid) -> Result<Vec<EmergencyContact>> {
        let contacts = sqlx::query_as::<_, EmergencyContact>(queries::SELECT_VERIFIED_CONTACTS)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(contacts)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserIdentity>> {
        let user = sqlx::query_as::<_, UserIdentity>(queries::SELECT_USER)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn mark_verified(&self, user_id: Uuid, phone: &str) -> Result<u64> {
        let result = sqlx::query(queries::MARK_CONTACTS_VERIFIED)
            .bind(user_id)
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
