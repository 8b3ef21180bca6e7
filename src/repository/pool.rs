//! SQLite connection pool.
//!
//! Connections are created on demand through diesel-async's
//! `SyncConnectionWrapper`, so the blocking SQLite driver runs off the
//! async executor.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

use super::util::to_diesel_error;

/// Diesel error type alias.
pub type DbError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Per-connection settings applied on every checkout.
const CONNECTION_PRAGMAS: &str = r#"
    PRAGMA synchronous = NORMAL;
    PRAGMA busy_timeout = 30000;
"#;

/// SQLite connection pool (lightweight - creates connections on demand).
#[derive(Debug, Clone)]
pub struct DbPool {
    database_url: String,
}

impl DbPool {
    /// Create a pool from a database URL or path. A `sqlite:` prefix is
    /// accepted and stripped.
    pub fn new(database_url: &str) -> Self {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    /// Create pool from a file path.
    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    /// Get a connection. Writers wait on a locked database instead of
    /// failing with `SQLITE_BUSY`.
    pub async fn get(&self) -> Result<SqliteConn, DbError> {
        let mut conn = SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(CONNECTION_PRAGMAS).await?;
        Ok(conn)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Run a block against a fresh connection from the pool.
///
/// Connection errors are propagated with `?`, so the enclosing function's
/// error type must implement `From<DbError>`.
///
/// # Example
/// ```ignore
/// with_conn!(self.pool, conn => {
///     entity_views::table.count().get_result::<i64>(&mut conn).await
/// })
/// ```
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident => $body:expr) => {{
        #[allow(unused_mut)]
        let mut $conn = $pool.get().await?;
        $body
    }};
}

#[allow(unused_imports)]
pub use with_conn;
