use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub mod contacts;
pub mod events;
#[cfg(test)]
pub mod memory;
pub mod queries;

pub use contacts::{ContactStore, PgContactStore};
pub use events::{EventFilter, EventStore, PgEventStore};

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}
