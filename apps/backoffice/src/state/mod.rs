//! # State Module
//!
//! Everything the commands share, grouped in one [`AppState`] built at
//! startup.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                          AppState                               │   │
//! │  │                                                                 │   │
//! │  │  config ─── AppConfig (read-only after startup)                 │   │
//! │  │  store ──── Arc<dyn RemoteStore>  (SqliteStore over Database)   │   │
//! │  │  gate / workflow / catalog ─── share the store                  │   │
//! │  │  session ── SessionState (RwLock + Subscription)                │   │
//! │  │  cart ───── CartState (Arc<Mutex<Cart>>)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • store: the pool is internally synchronized                          │
//! │  • session: short RwLock reads, subscription swaps behind a Mutex      │
//! │  • cart: exclusive Mutex, never held across an await                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod session;

pub use cart::{CartState, IssueGuard};
pub use session::SessionState;

use std::sync::Arc;

use comptoir_db::Database;
use comptoir_sync::{Catalog, RemoteStore, SessionGate, SqliteStore, Workflow};

use crate::config::AppConfig;

pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub store: Arc<dyn RemoteStore>,
    pub gate: SessionGate,
    pub workflow: Workflow,
    pub catalog: Catalog,
    pub session: SessionState,
    pub cart: CartState,
}

impl AppState {
    /// Wires the workflows to a [`SqliteStore`] over `db`.
    pub fn new(config: AppConfig, db: Database) -> Self {
        let store: Arc<dyn RemoteStore> = Arc::new(SqliteStore::new(db.clone()));
        AppState {
            config,
            db,
            gate: SessionGate::new(store.clone()),
            workflow: Workflow::new(store.clone()),
            catalog: Catalog::new(store.clone()),
            store,
            session: SessionState::new(),
            cart: CartState::new(),
        }
    }
}
