//! Test doubles shared by the workflow and subscription tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use comptoir_core::{Customer, Money, Product, Profile, Role, SalesDocument, Settings};
use comptoir_db::{Database, DbConfig, WriteBatch, WriteOp};

use crate::error::{SyncError, SyncResult};
use crate::session::Session;
use crate::store::{ChangeEvent, RemoteStore, SqliteStore};

/// Wraps a real [`SqliteStore`] and fails every call while offline.
pub struct FlakyStore {
    inner: SqliteStore,
    offline: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: SqliteStore) -> Self {
        FlakyStore {
            inner,
            offline: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> SyncResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SyncError::RemoteUnavailable("network unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    async fn products(&self, owner: &str) -> SyncResult<Vec<Product>> {
        self.check()?;
        self.inner.products(owner).await
    }

    async fn customers(&self, owner: &str) -> SyncResult<Vec<Customer>> {
        self.check()?;
        self.inner.customers(owner).await
    }

    async fn documents(&self, owner: &str) -> SyncResult<Vec<SalesDocument>> {
        self.check()?;
        self.inner.documents(owner).await
    }

    async fn settings(&self, owner: &str) -> SyncResult<Option<Settings>> {
        self.check()?;
        self.inner.settings(owner).await
    }

    async fn products_by_ids(&self, owner: &str, ids: &[String]) -> SyncResult<Vec<Product>> {
        self.check()?;
        self.inner.products_by_ids(owner, ids).await
    }

    async fn profile(&self, user_id: &str) -> SyncResult<Option<Profile>> {
        self.check()?;
        self.inner.profile(user_id).await
    }

    async fn profile_count(&self) -> SyncResult<i64> {
        self.check()?;
        self.inner.profile_count().await
    }

    async fn upsert_profile(&self, profile: &Profile) -> SyncResult<()> {
        self.check()?;
        self.inner.upsert_profile(profile).await
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> SyncResult<()> {
        self.check()?;
        self.inner.record_login(user_id, at).await
    }

    async fn commit(&self, owner: &str, batch: &WriteBatch) -> SyncResult<u64> {
        self.check()?;
        self.inner.commit(owner, batch).await
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.changes()
    }
}

pub const OWNER: &str = "owner-1";

pub async fn flaky_store() -> Arc<FlakyStore> {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Arc::new(FlakyStore::new(SqliteStore::new(db)))
}

pub fn session() -> Session {
    Session {
        user_id: OWNER.to_string(),
        email: "gerant@atlas.ma".to_string(),
        approved: true,
        role: Role::Admin,
    }
}

pub fn product(id: &str, price_centimes: i64, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        reference: format!("REF-{}", id.to_uppercase()),
        name: format!("Produit {id}"),
        description: String::new(),
        purchase_price: Money::from_centimes(price_centimes * 6 / 10),
        sale_price: Money::from_centimes(price_centimes),
        stock,
    }
}

pub async fn seed_products(store: &FlakyStore, products: &[Product]) {
    let batch: WriteBatch = products.iter().cloned().map(WriteOp::UpsertProduct).collect();
    store.inner().commit(OWNER, &batch).await.unwrap();
}

pub async fn stock_of(store: &FlakyStore, id: &str) -> i64 {
    store
        .inner()
        .database()
        .products()
        .get(OWNER, id)
        .await
        .unwrap()
        .map(|p| p.stock)
        .unwrap_or_default()
}
