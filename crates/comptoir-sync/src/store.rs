//! # Remote Store Boundary
//!
//! [`RemoteStore`] is everything the back office needs from the hosted
//! document store: owner-scoped collection reads, the authoritative product
//! read used by stock checks, profiles, an all-or-nothing batch commit and
//! a change feed. [`SqliteStore`] implements it over `comptoir-db`.
//!
//! ## Change Feed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Workflow ──commit(owner, batch)──► SqliteStore                         │
//! │                                        │                                │
//! │                                        ├── Database::commit (1 tx)      │
//! │                                        │                                │
//! │                                        ▼  for each touched collection   │
//! │                           broadcast::Sender<ChangeEvent>                │
//! │                              │                 │                        │
//! │                              ▼                 ▼                        │
//! │                        Subscription A    Subscription B                 │
//! │                        (re-fetch)        (re-fetch)                     │
//! │                                                                         │
//! │  Nothing is announced for a failed commit.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use comptoir_core::{Customer, Product, Profile, SalesDocument, Settings};
use comptoir_db::{Collection, Database, WriteBatch};

use crate::error::SyncResult;

/// Capacity of the change feed; a subscriber that falls further behind
/// re-fetches everything.
const CHANGE_FEED_CAPACITY: usize = 256;

/// "Collection X of owner Y changed."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub owner: String,
    pub collection: Collection,
}

// =============================================================================
// Remote Store Trait
// =============================================================================

/// The persistence and sync service, as seen by the workflows.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Full product collection of an owner.
    async fn products(&self, owner: &str) -> SyncResult<Vec<Product>>;

    /// Full customer collection of an owner.
    async fn customers(&self, owner: &str) -> SyncResult<Vec<Customer>>;

    /// Full document collection of an owner, newest first.
    async fn documents(&self, owner: &str) -> SyncResult<Vec<SalesDocument>>;

    /// The owner's settings, `None` before first-run seeding.
    async fn settings(&self, owner: &str) -> SyncResult<Option<Settings>>;

    /// Authoritative current rows for the given product ids.
    async fn products_by_ids(&self, owner: &str, ids: &[String]) -> SyncResult<Vec<Product>>;

    async fn profile(&self, user_id: &str) -> SyncResult<Option<Profile>>;

    /// Number of profiles ever created.
    async fn profile_count(&self) -> SyncResult<i64>;

    async fn upsert_profile(&self, profile: &Profile) -> SyncResult<()>;

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> SyncResult<()>;

    /// Applies the batch atomically. Returns the number of rows affected.
    async fn commit(&self, owner: &str, batch: &WriteBatch) -> SyncResult<u64>;

    /// A new receiver on the change feed.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

// =============================================================================
// SQLite Store
// =============================================================================

/// [`RemoteStore`] backed by the local SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
    changes_tx: broadcast::Sender<ChangeEvent>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        let (changes_tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        SqliteStore { db, changes_tx }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Announces a change made outside [`RemoteStore::commit`].
    pub fn notify(&self, owner: &str, collection: Collection) {
        // No receivers is fine: nobody is subscribed yet.
        let _ = self.changes_tx.send(ChangeEvent {
            owner: owner.to_string(),
            collection,
        });
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn products(&self, owner: &str) -> SyncResult<Vec<Product>> {
        Ok(self.db.products().list(owner).await?)
    }

    async fn customers(&self, owner: &str) -> SyncResult<Vec<Customer>> {
        Ok(self.db.customers().list(owner).await?)
    }

    async fn documents(&self, owner: &str) -> SyncResult<Vec<SalesDocument>> {
        Ok(self.db.documents().list(owner).await?)
    }

    async fn settings(&self, owner: &str) -> SyncResult<Option<Settings>> {
        Ok(self.db.settings().get(owner).await?)
    }

    async fn products_by_ids(&self, owner: &str, ids: &[String]) -> SyncResult<Vec<Product>> {
        Ok(self.db.products().get_many(owner, ids).await?)
    }

    async fn profile(&self, user_id: &str) -> SyncResult<Option<Profile>> {
        Ok(self.db.profiles().get(user_id).await?)
    }

    async fn profile_count(&self) -> SyncResult<i64> {
        Ok(self.db.profiles().count().await?)
    }

    async fn upsert_profile(&self, profile: &Profile) -> SyncResult<()> {
        Ok(self.db.profiles().upsert(profile).await?)
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> SyncResult<()> {
        Ok(self.db.profiles().touch_last_login(user_id, at).await?)
    }

    async fn commit(&self, owner: &str, batch: &WriteBatch) -> SyncResult<u64> {
        let rows = self.db.commit(owner, batch).await?;

        let collections = batch.collections();
        debug!(owner, ?collections, "Announcing committed changes");
        for collection in collections {
            self.notify(owner, collection);
        }

        Ok(rows)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes_tx.subscribe()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use comptoir_core::Money;
    use comptoir_db::{DbConfig, WriteOp};

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            reference: format!("PRD-{id}"),
            name: id.to_string(),
            description: String::new(),
            purchase_price: Money::from_centimes(100),
            sale_price: Money::from_centimes(200),
            stock: 1,
        }
    }

    #[tokio::test]
    async fn test_commit_announces_touched_collections() {
        let store = SqliteStore::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let mut changes = store.changes();

        let batch: WriteBatch = vec![
            WriteOp::UpsertProduct(product("p1")),
            WriteOp::UpsertCustomer(Customer::walk_in("c1")),
        ]
        .into_iter()
        .collect();
        store.commit("owner", &batch).await.unwrap();

        let first = changes.recv().await.unwrap();
        let second = changes.recv().await.unwrap();
        assert_eq!(first.collection, Collection::Products);
        assert_eq!(second.collection, Collection::Customers);
        assert_eq!(first.owner, "owner");
    }

    #[tokio::test]
    async fn test_failed_commit_announces_nothing() {
        let store = SqliteStore::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let mut changes = store.changes();

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::DeleteProduct { id: "ghost".into() });
        assert!(store.commit("owner", &batch).await.is_err());

        assert!(matches!(
            changes.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
