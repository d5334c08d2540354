//! # comptoir-sync: Synchronization Shell for Comptoir
//!
//! Keeps the back office's view of one owner's data current and runs every
//! write workflow against the store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      comptoir-sync (THIS CRATE)                         │
//! │                                                                         │
//! │   ┌──────────────┐   sign_in    ┌──────────────────────────────────┐    │
//! │   │ SessionGate  │─────────────►│ Session { user_id, approved }    │    │
//! │   └──────────────┘              └───────────────┬──────────────────┘    │
//! │                                                 │ passed into every     │
//! │                                                 │ call below            │
//! │        ┌────────────────────────┬───────────────┴───────┐               │
//! │        ▼                        ▼                       ▼               │
//! │   ┌──────────┐           ┌────────────┐          ┌──────────────┐       │
//! │   │ Workflow │           │  Catalog   │          │ Subscription │       │
//! │   │ issue    │           │ products   │          │  ReadModel   │       │
//! │   │ convert  │           │ customers  │          │  (watch)     │       │
//! │   │ cancel   │           │ settings   │          └──────▲───────┘       │
//! │   └────┬─────┘           └─────┬──────┘                 │ ChangeEvent   │
//! │        │ commit(batch)         │ commit(batch)          │ (broadcast)   │
//! │        ▼                       ▼                        │               │
//! │   ┌─────────────────────────────────────────────────────┴──────────┐    │
//! │   │            RemoteStore  (SqliteStore over comptoir-db)         │    │
//! │   └────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`store`] - The `RemoteStore` boundary and its SQLite implementation
//! - [`session`] - Explicit sessions, sign-in and first-run seeding
//! - [`subscription`] - Live snapshots and the read model
//! - [`issuance`] - Issue, convert, cancel, delete documents
//! - [`catalog`] - Product, customer and settings maintenance
//! - [`error`] - Sync error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod issuance;
pub mod session;
pub mod store;
pub mod subscription;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::{Catalog, ClearStockOutcome};
pub use error::{SyncError, SyncResult};
pub use issuance::Workflow;
pub use session::{require_session, ApprovalWatch, Session, SessionGate};
pub use store::{ChangeEvent, RemoteStore, SqliteStore};
pub use subscription::{ReadModel, Snapshot, Subscription};
