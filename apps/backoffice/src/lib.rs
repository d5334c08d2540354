//! # Comptoir Back Office
//!
//! Back office for a single-owner shop: stock, customers, counter sales,
//! quotes, delivery notes and invoices in Moroccan dirhams.
//!
//! ## Module Organization
//! ```text
//! comptoir_backoffice/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── config.rs       ◄─── comptoir.toml + COMPTOIR_* overrides
//! ├── error.rs        ◄─── API error type for commands
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState
//! │   ├── session.rs  ◄─── Session + live read model
//! │   └── cart.rs     ◄─── Cart behind a Mutex
//! └── commands/       ◄─── One module per screen
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Load config ───────► file, then environment, then validate          │
//! │  2. Init tracing ──────► RUST_LOG, else [logging] filter                │
//! │  3. Open database ─────► SQLite, WAL, migrations                        │
//! │  4. Build AppState ────► store, workflows, empty cart                   │
//! │  5. Sign owner in ─────► profile, first-run seed, subscription          │
//! │     (pending: wait for approval, then sign in again)                    │
//! │  6. Serve until Ctrl+C, then sign out and close the pool                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use comptoir_core::format::format_currency;
use comptoir_db::{Database, DbConfig};

use crate::config::AppConfig;
use crate::state::AppState;

/// Runs the back office until Ctrl+C.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(None)?;
    init_tracing(&config.logging.filter);

    info!("Starting Comptoir back office");

    let db_path = config.database_path()?;
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path).max_connections(config.database.max_connections)).await?;
    info!("Database connected and migrations applied");

    let state = AppState::new(config, db);
    let owner = state.config.owner.clone();

    let session = commands::session::sign_in(&state, &owner.user_id, &owner.email).await?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let stop_requested = if session.approved {
        false
    } else {
        warn!(email = %session.email, "Account awaiting approval, data stays hidden");
        tokio::select! {
            view = commands::session::wait_for_approval(&state) => {
                view?;
                false
            }
            result = &mut shutdown => {
                result?;
                true
            }
        }
    };

    if !stop_requested {
        log_dashboard(&state);
        shutdown.await?;
    }
    info!("Shutdown requested");

    commands::session::sign_out(&state).await;
    state.db.close().await;
    Ok(())
}

fn log_dashboard(state: &AppState) {
    match commands::reports::dashboard(state) {
        Ok(summary) => {
            info!(
                products = summary.product_count,
                customers = summary.customer_count,
                documents = summary.document_count,
                stock_value = %format_currency(summary.stock_value),
                invoiced = %format_currency(summary.total_invoiced),
                low_stock = summary.low_stock.len(),
                "Dashboard"
            );
            if let Ok(json) = serde_json::to_string(&summary.best_sellers) {
                info!(best_sellers = %json, "Best sellers");
            }
        }
        Err(e) => warn!(error = %e, "Dashboard unavailable"),
    }
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter.
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}
