//! # Database Handle
//!
//! Opens the SQLite file that stands in for the hosted document store and
//! hands out per-collection repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new(path) ──► Database::new(config).await                    │
//! │                               │                                         │
//! │                               ├── open (WAL, NORMAL sync, busy timeout) │
//! │                               ├── embedded migrations (unless off)      │
//! │                               ▼                                         │
//! │                          SqlitePool (cloned into every handle)          │
//! │                               │                                         │
//! │            ┌──────────────────┼───────────────────────┐                 │
//! │            ▼                  ▼                       ▼                 │
//! │     products()/...      profiles()          commit(owner, &batch)       │
//! │     owner-scoped reads  identity rows       one transaction             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A subscription re-fetch can overlap a batch commit. WAL lets the read
//! proceed; the busy timeout covers two writers meeting. The in-memory
//! database used by tests lives on a single connection that must never be
//! recycled, or the data goes with it.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::document::DocumentRepository;
use crate::repository::product::ProductRepository;
use crate::repository::profile::ProfileRepository;
use crate::repository::settings::SettingsRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the store.
///
/// ```rust,ignore
/// let config = DbConfig::new(data_dir.join("comptoir.db")).max_connections(4);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// Default: 5. Forced to 1 in memory.
    pub max_connections: u32,
    /// How long a writer waits on a locked file before failing.
    pub busy_timeout: Duration,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
    /// Apply pending migrations on open. Default: true.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// A private database that disappears with the handle.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            busy_timeout: Duration::from_secs(1),
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Opens the file as it is, for a schema managed elsewhere.
    pub fn run_migrations(mut self, enabled: bool) -> Self {
        self.run_migrations = enabled;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!("sqlite://{}", self.database_path.display()))
                .map(|o| {
                    o.create_if_missing(true)
                        .journal_mode(SqliteJournalMode::Wal)
                        .synchronous(SqliteSynchronous::Normal)
                })
        };

        options
            .map(|o| o.foreign_keys(true).busy_timeout(self.busy_timeout))
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle on the store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store and applies pending migrations when configured to.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening store");

        let in_memory = config.is_in_memory();
        let options = config.connect_options()?;

        let pool_options = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { config.max_connections })
            .acquire_timeout(config.acquire_timeout);

        let pool_options = if in_memory {
            pool_options.min_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            pool_options
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(in_memory, max_connections = config.max_connections, "Pool ready");

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
        } else {
            debug!("Migrations disabled, using schema as found");
        }
        info!("Store ready");

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository::new(self.pool.clone())
    }

    /// Closes every connection. Later calls fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing store");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
