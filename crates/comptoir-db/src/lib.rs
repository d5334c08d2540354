//! # comptoir-db: Database Layer for Comptoir
//!
//! This crate is the document store behind the back office: SQLite through
//! sqlx, every business row partitioned by owner id.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comptoir Data Flow                               │
//! │                                                                         │
//! │  comptoir-sync (RemoteStore, subscriptions, issuance)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   comptoir-db (THIS CRATE)                      │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │ products      │    │  (embedded)  │    │    │
//! │  │   │               │◄───│ customers     │    │ 001_init.sql │    │    │
//! │  │   │ SqlitePool    │    │ documents     │    │              │    │    │
//! │  │   │ commit(batch) │    │ settings      │    │              │    │    │
//! │  │   │  (batch.rs)   │    │ profiles      │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use comptoir_db::{Database, DbConfig, WriteBatch, WriteOp};
//!
//! let db = Database::new(DbConfig::new("comptoir.db")).await?;
//!
//! let products = db.products().list(owner_id).await?;
//!
//! let mut batch = WriteBatch::new();
//! batch.push(WriteOp::DeleteProduct { id: product_id.to_string() });
//! db.commit(owner_id, &batch).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use batch::{Collection, WriteBatch, WriteOp};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::customer::CustomerRepository;
pub use repository::document::DocumentRepository;
pub use repository::product::ProductRepository;
pub use repository::profile::ProfileRepository;
pub use repository::settings::SettingsRepository;
