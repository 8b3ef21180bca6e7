//! Database persistence for view counters.

pub mod pool;
pub mod util;

use diesel::prelude::*;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};
use tracing::debug;

use crate::schema;
use crate::with_conn;
pub use pool::{DbError, DbPool};

/// Persisted view counter row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::entity_views)]
#[diesel(primary_key(entity_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EntityViewsRecord {
    pub entity_id: i64,
    pub views: i64,
    pub updated_at: String,
}

/// Create the view counter table and its index if they are missing.
pub async fn init_schema(pool: &DbPool) -> Result<(), DbError> {
    let statements = [
        r#"CREATE TABLE IF NOT EXISTS entity_views (
            entity_id INTEGER PRIMARY KEY,
            views INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS idx_entity_views_views ON entity_views(views)",
    ];

    with_conn!(pool, conn => {
        // Persistent for the database file; lets readers run beside a writer.
        conn.batch_execute("PRAGMA journal_mode = WAL;").await?;
        for stmt in statements {
            diesel::sql_query(stmt).execute(&mut conn).await?;
        }
    });
    debug!("Schema ready at {}", pool.database_url());

    Ok(())
}
