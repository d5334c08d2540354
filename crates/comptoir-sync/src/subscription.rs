//! # Subscriptions and the Read Model
//!
//! A [`Subscription`] keeps one owner's four collections published as full
//! snapshots; [`ReadModel`] is the cheap, cloneable view every screen reads.
//!
//! ## Subscription Task
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  attach(store, session)                                                 │
//! │       │  changes = store.changes()   ← before the first fetch, so no    │
//! │       │                                change is missed                 │
//! │       ▼                                                                 │
//! │  spawn ─► load all 4 collections ─► publish (watch::Sender<Snapshot>)   │
//! │              │                                                          │
//! │              ▼                                                          │
//! │         loop select! {                                                  │
//! │            shutdown      → break                                        │
//! │            ChangeEvent   → same owner? re-fetch that collection,        │
//! │                            then the pending ones                        │
//! │            Lagged(n)     → re-fetch all                                 │
//! │            Closed        → break                                        │
//! │            retry tick    → re-fetch the pending ones (only if any)      │
//! │         }                                                               │
//! │                                                                         │
//! │  Fetch failed → keep the previous snapshot (stale but available), warn, │
//! │                 mark the collection pending until a fetch succeeds      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use comptoir_core::metrics::{self, DashboardSummary, MetricsOptions, RevenueReport};
use comptoir_core::{Customer, DocumentType, Product, SalesDocument, Settings};
use comptoir_db::Collection;

use crate::error::{SyncError, SyncResult};
use crate::session::{require_session, Session};
use crate::store::{ChangeEvent, RemoteStore};

/// How often collections whose last fetch failed are fetched again.
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// Snapshot
// =============================================================================

/// The latest published state of the four collections.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub products: Arc<Vec<Product>>,
    pub customers: Arc<Vec<Customer>>,
    pub documents: Arc<Vec<SalesDocument>>,
    /// `None` until the owner is seeded.
    pub settings: Option<Arc<Settings>>,
    /// Set once the settings fetch has answered at least once.
    pub loaded: bool,
}

// =============================================================================
// Read Model
// =============================================================================

/// Read-only view over a subscription's snapshots.
#[derive(Debug, Clone)]
pub struct ReadModel {
    rx: watch::Receiver<Snapshot>,
}

impl ReadModel {
    /// Current snapshot (clones the `Arc`s, not the collections).
    pub fn snapshot(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    pub fn products(&self) -> Arc<Vec<Product>> {
        self.rx.borrow().products.clone()
    }

    pub fn customers(&self) -> Arc<Vec<Customer>> {
        self.rx.borrow().customers.clone()
    }

    pub fn documents(&self) -> Arc<Vec<SalesDocument>> {
        self.rx.borrow().documents.clone()
    }

    /// Stored settings, or the defaults before seeding.
    pub fn settings(&self) -> Settings {
        self.rx
            .borrow()
            .settings
            .as_deref()
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.rx.borrow().loaded
    }

    /// Waits until the first settings answer has been published.
    pub async fn wait_loaded(&mut self) -> SyncResult<()> {
        self.rx
            .wait_for(|snapshot| snapshot.loaded)
            .await
            .map(|_| ())
            .map_err(|_| SyncError::SubscriptionClosed)
    }

    /// Waits for the next publish.
    pub async fn changed(&mut self) -> SyncResult<()> {
        self.rx.changed().await.map_err(|_| SyncError::SubscriptionClosed)
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    pub fn product(&self, id: &str) -> Option<Product> {
        self.rx.borrow().products.iter().find(|p| p.id == id).cloned()
    }

    pub fn customer(&self, id: &str) -> Option<Customer> {
        self.rx.borrow().customers.iter().find(|c| c.id == id).cloned()
    }

    pub fn document(&self, id: &str) -> Option<SalesDocument> {
        self.rx.borrow().documents.iter().find(|d| d.id == id).cloned()
    }

    /// Point-of-sale search: products in stock whose name or reference
    /// contains `term`, ignoring case. An empty term lists everything in
    /// stock.
    pub fn search_products(&self, term: &str) -> Vec<Product> {
        let needle = term.trim().to_lowercase();
        self.rx
            .borrow()
            .products
            .iter()
            .filter(|p| p.stock > 0)
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.reference.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// The walk-in customer, preselected for a new sale.
    pub fn default_customer(&self) -> Option<Customer> {
        self.rx
            .borrow()
            .customers
            .iter()
            .find(|c| c.is_walk_in())
            .cloned()
    }

    /// Documents of one type (all when `None`), newest first.
    pub fn documents_of_type(&self, doc_type: Option<DocumentType>) -> Vec<SalesDocument> {
        self.rx
            .borrow()
            .documents
            .iter()
            .filter(|d| doc_type.map_or(true, |t| d.doc_type == t))
            .cloned()
            .collect()
    }

    pub fn dashboard(&self, options: MetricsOptions) -> DashboardSummary {
        let snapshot = self.snapshot();
        metrics::dashboard(
            &snapshot.products,
            &snapshot.customers,
            &snapshot.documents,
            options,
        )
    }

    /// Revenue report over all documents, or one calendar year.
    pub fn revenue_report(&self, year: Option<i32>, options: MetricsOptions) -> RevenueReport {
        let snapshot = self.snapshot();
        match year {
            Some(year) => {
                let documents = metrics::documents_in_year(&snapshot.documents, year);
                metrics::revenue_report(&documents, &snapshot.products, options)
            }
            None => metrics::revenue_report(&snapshot.documents, &snapshot.products, options),
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Live subscription to one owner's collections.
///
/// Dropping it aborts the background task; [`Subscription::unsubscribe`]
/// stops it and waits for it to finish.
pub struct Subscription {
    owner: String,
    read_model: ReadModel,
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Starts publishing the session owner's collections.
    pub fn attach(store: Arc<dyn RemoteStore>, session: Option<&Session>) -> SyncResult<Self> {
        let session = require_session(session)?;
        let owner = session.owner().to_string();

        let (tx, rx) = watch::channel(Snapshot::default());
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let changes = store.changes();

        info!(owner = %owner, "Attaching subscription");
        let task = tokio::spawn(run(store, owner.clone(), tx, changes, shutdown_rx));

        Ok(Subscription {
            owner,
            read_model: ReadModel { rx },
            shutdown_tx,
            task: Some(task),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn read_model(&self) -> ReadModel {
        self.read_model.clone()
    }

    /// Stops the background task and waits for it to exit.
    pub async fn unsubscribe(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(owner = %self.owner, error = %e, "Subscription task ended abnormally");
            }
        }
        info!(owner = %self.owner, "Subscription detached");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    store: Arc<dyn RemoteStore>,
    owner: String,
    tx: watch::Sender<Snapshot>,
    mut changes: broadcast::Receiver<ChangeEvent>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut pending = Vec::new();
    refresh_all(store.as_ref(), &owner, &tx, &mut pending).await;

    let mut retry = tokio::time::interval(RETRY_INTERVAL);
    retry.set_missed_tick_behavior(MissedTickBehavior::Delay);
    retry.reset();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!(owner = %owner, "Subscription shutting down");
                break;
            }

            event = changes.recv() => match event {
                Ok(event) if event.owner == owner => {
                    pending.retain(|c| *c != event.collection);
                    if !refresh(store.as_ref(), &owner, event.collection, &tx).await {
                        pending.push(event.collection);
                    }
                    retry_pending(store.as_ref(), &owner, &tx, &mut pending).await;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(owner = %owner, missed, "Change feed lagged, reloading everything");
                    refresh_all(store.as_ref(), &owner, &tx, &mut pending).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(owner = %owner, "Change feed closed");
                    break;
                }
            },

            _ = retry.tick(), if !pending.is_empty() => {
                retry_pending(store.as_ref(), &owner, &tx, &mut pending).await;
            }
        }
    }
}

async fn refresh_all(
    store: &dyn RemoteStore,
    owner: &str,
    tx: &watch::Sender<Snapshot>,
    pending: &mut Vec<Collection>,
) {
    pending.clear();
    for collection in Collection::ALL {
        if !refresh(store, owner, collection, tx).await {
            pending.push(collection);
        }
    }
}

/// Fetches again every collection whose last fetch failed; the ones that
/// fail again stay pending.
async fn retry_pending(
    store: &dyn RemoteStore,
    owner: &str,
    tx: &watch::Sender<Snapshot>,
    pending: &mut Vec<Collection>,
) {
    for collection in std::mem::take(pending) {
        if !refresh(store, owner, collection, tx).await {
            pending.push(collection);
        }
    }
}

/// Re-fetches one collection and publishes it. On failure the previous
/// snapshot stays published and `false` is returned.
async fn refresh(
    store: &dyn RemoteStore,
    owner: &str,
    collection: Collection,
    tx: &watch::Sender<Snapshot>,
) -> bool {
    let result = match collection {
        Collection::Products => store.products(owner).await.map(|products| {
            tx.send_modify(|s| s.products = Arc::new(products));
        }),
        Collection::Customers => store.customers(owner).await.map(|customers| {
            tx.send_modify(|s| s.customers = Arc::new(customers));
        }),
        Collection::Documents => store.documents(owner).await.map(|documents| {
            tx.send_modify(|s| s.documents = Arc::new(documents));
        }),
        Collection::Settings => store.settings(owner).await.map(|settings| {
            tx.send_modify(|s| {
                s.settings = settings.map(Arc::new);
                s.loaded = true;
            });
        }),
    };

    match result {
        Ok(()) => {
            debug!(owner, ?collection, "Published snapshot");
            true
        }
        Err(e) => {
            warn!(owner, ?collection, error = %e, "Fetch failed, keeping last snapshot");
            false
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
