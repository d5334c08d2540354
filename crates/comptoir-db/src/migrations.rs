//! # Schema Migrations
//!
//! The schema under `migrations/sqlite/` is compiled into the binary and
//! applied by [`Database::new`](crate::Database::new). Applied files are
//! recorded in `_sqlx_migrations`; a file that changed after being applied
//! fails the open, so schema changes always go in a new `NNN_*.sql` file.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration. Safe to call on an up-to-date store.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    debug!(count = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
