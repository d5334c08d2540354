//! # Write Batches
//!
//! Every business write goes through [`Database::commit`]: a list of
//! operations applied in one SQLite transaction, all or nothing.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WriteBatch [CreateDocument, AdjustStock(p1,-2), AdjustStock(p2,-1)]    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   ├── INSERT documents ...                         ✓                    │
//! │   ├── UPDATE products SET stock = stock - 2 ...    ✓                    │
//! │   └── UPDATE products SET stock = stock - 1 ...    ✗ 0 rows (deleted)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ROLLBACK ← transaction dropped, nothing written, NotFound returned     │
//! │                                                                         │
//! │  All ops succeed → COMMIT → caller announces the touched collections    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::customer::CustomerRepository;
use crate::repository::document::DocumentRepository;
use crate::repository::product::ProductRepository;
use crate::repository::settings::SettingsRepository;
use comptoir_core::{Customer, DocumentStatus, Product, SalesDocument, Settings};

// =============================================================================
// Collections
// =============================================================================

/// The four owner-scoped collections of the read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Products,
    Customers,
    Documents,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Products,
        Collection::Customers,
        Collection::Documents,
        Collection::Settings,
    ];
}

// =============================================================================
// Operations
// =============================================================================

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    CreateDocument(SalesDocument),
    UpdateDocumentStatus { id: String, status: DocumentStatus },
    DeleteDocument { id: String },
    /// Adds `delta` to the stock; negative on issuance.
    AdjustStock { product_id: String, delta: i64 },
    UpsertProduct(Product),
    DeleteProduct { id: String },
    /// Removes the whole catalog ("clear stock").
    DeleteAllProducts,
    UpsertCustomer(Customer),
    DeleteCustomer { id: String },
    UpsertSettings(Settings),
}

impl WriteOp {
    /// Collection this operation writes to.
    pub fn collection(&self) -> Collection {
        match self {
            WriteOp::CreateDocument(_)
            | WriteOp::UpdateDocumentStatus { .. }
            | WriteOp::DeleteDocument { .. } => Collection::Documents,
            WriteOp::AdjustStock { .. }
            | WriteOp::UpsertProduct(_)
            | WriteOp::DeleteProduct { .. }
            | WriteOp::DeleteAllProducts => Collection::Products,
            WriteOp::UpsertCustomer(_) | WriteOp::DeleteCustomer { .. } => Collection::Customers,
            WriteOp::UpsertSettings(_) => Collection::Settings,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            WriteOp::CreateDocument(_) => "create_document",
            WriteOp::UpdateDocumentStatus { .. } => "update_document_status",
            WriteOp::DeleteDocument { .. } => "delete_document",
            WriteOp::AdjustStock { .. } => "adjust_stock",
            WriteOp::UpsertProduct(_) => "upsert_product",
            WriteOp::DeleteProduct { .. } => "delete_product",
            WriteOp::DeleteAllProducts => "delete_all_products",
            WriteOp::UpsertCustomer(_) => "upsert_customer",
            WriteOp::DeleteCustomer { .. } => "delete_customer",
            WriteOp::UpsertSettings(_) => "upsert_settings",
        }
    }
}

/// Ordered list of writes committed atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Distinct collections written by this batch, in first-write order.
    pub fn collections(&self) -> Vec<Collection> {
        let mut touched = Vec::new();
        for op in &self.ops {
            let collection = op.collection();
            if !touched.contains(&collection) {
                touched.push(collection);
            }
        }
        touched
    }
}

impl FromIterator<WriteOp> for WriteBatch {
    fn from_iter<I: IntoIterator<Item = WriteOp>>(iter: I) -> Self {
        WriteBatch {
            ops: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Commit
// =============================================================================

impl Database {
    /// Applies `batch` to the owner's partition in a single transaction.
    ///
    /// Returns the total number of rows affected. Any failing operation
    /// (including an update or delete that matches no row) rolls back the
    /// whole batch.
    pub async fn commit(&self, owner_id: &str, batch: &WriteBatch) -> DbResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool().begin().await?;
        let mut affected = 0;

        for op in batch.ops() {
            match apply(&mut tx, owner_id, op).await {
                Ok(rows) => affected += rows,
                Err(err) => {
                    warn!(owner_id, op = op.name(), error = %err, "Batch operation failed, rolling back");
                    return Err(err);
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(owner_id, ops = batch.len(), rows = affected, "Batch committed");
        Ok(affected)
    }
}

async fn apply(conn: &mut SqliteConnection, owner_id: &str, op: &WriteOp) -> DbResult<u64> {
    debug!(op = op.name(), "Applying batch operation");

    match op {
        WriteOp::CreateDocument(document) => {
            DocumentRepository::insert_in(conn, owner_id, document).await?;
            Ok(1)
        }
        WriteOp::UpdateDocumentStatus { id, status } => {
            DocumentRepository::update_status_in(conn, owner_id, id, *status).await?;
            Ok(1)
        }
        WriteOp::DeleteDocument { id } => {
            DocumentRepository::delete_in(conn, owner_id, id).await?;
            Ok(1)
        }
        WriteOp::AdjustStock { product_id, delta } => {
            ProductRepository::adjust_stock_in(conn, owner_id, product_id, *delta).await?;
            Ok(1)
        }
        WriteOp::UpsertProduct(product) => {
            ProductRepository::upsert_in(conn, owner_id, product).await?;
            Ok(1)
        }
        WriteOp::DeleteProduct { id } => {
            ProductRepository::delete_in(conn, owner_id, id).await?;
            Ok(1)
        }
        WriteOp::DeleteAllProducts => ProductRepository::delete_all_in(conn, owner_id).await,
        WriteOp::UpsertCustomer(customer) => {
            CustomerRepository::upsert_in(conn, owner_id, customer).await?;
            Ok(1)
        }
        WriteOp::DeleteCustomer { id } => {
            CustomerRepository::delete_in(conn, owner_id, id).await?;
            Ok(1)
        }
        WriteOp::UpsertSettings(settings) => {
            SettingsRepository::upsert_in(conn, owner_id, settings).await?;
            Ok(1)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
