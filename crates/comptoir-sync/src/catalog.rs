//! # Catalog Maintenance
//!
//! Products, customers and settings: validated upserts and deletions, each
//! committed as one batch.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use comptoir_core::validation;
use comptoir_core::{CoreError, Customer, Product, Settings};
use comptoir_db::{WriteBatch, WriteOp};

use crate::error::SyncResult;
use crate::session::{require_session, Session};
use crate::store::RemoteStore;

/// Result of clearing the product catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "count", rename_all = "camelCase")]
pub enum ClearStockOutcome {
    AlreadyEmpty,
    Deleted(u64),
}

pub struct Catalog {
    store: Arc<dyn RemoteStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Catalog { store }
    }

    async fn commit(&self, session: &Session, batch: WriteBatch) -> SyncResult<u64> {
        self.store.commit(session.owner(), &batch).await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Validates and saves a product. A new product gets an id, and an
    /// empty reference is generated.
    pub async fn save_product(
        &self,
        session: Option<&Session>,
        mut product: Product,
    ) -> SyncResult<Product> {
        let session = require_session(session)?;

        if product.id.trim().is_empty() {
            product.id = Uuid::new_v4().to_string();
        }
        if product.reference.trim().is_empty() {
            let entropy = (Uuid::new_v4().as_u128() % 1_000) as u32;
            product.reference = Product::generate_reference(Utc::now().timestamp_millis(), entropy);
        }
        validation::validate_product(&product)?;

        self.commit(session, [WriteOp::UpsertProduct(product.clone())].into_iter().collect())
            .await?;

        info!(owner = %session.owner(), reference = %product.reference, "Product saved");
        Ok(product)
    }

    pub async fn delete_product(&self, session: Option<&Session>, id: &str) -> SyncResult<()> {
        self.delete_products(session, &[id.to_string()]).await.map(|_| ())
    }

    /// Deletes the selected products in one batch; one missing id fails
    /// them all.
    pub async fn delete_products(&self, session: Option<&Session>, ids: &[String]) -> SyncResult<u64> {
        let session = require_session(session)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let batch: WriteBatch = ids
            .iter()
            .map(|id| WriteOp::DeleteProduct { id: id.clone() })
            .collect();
        let deleted = self.commit(session, batch).await?;

        info!(owner = %session.owner(), deleted, "Products deleted");
        Ok(deleted)
    }

    /// Deletes every product of the owner.
    pub async fn clear_stock(&self, session: Option<&Session>) -> SyncResult<ClearStockOutcome> {
        let session = require_session(session)?;

        let deleted = self
            .commit(session, [WriteOp::DeleteAllProducts].into_iter().collect())
            .await?;

        if deleted == 0 {
            info!(owner = %session.owner(), "Stock already empty");
            return Ok(ClearStockOutcome::AlreadyEmpty);
        }
        info!(owner = %session.owner(), deleted, "Stock cleared");
        Ok(ClearStockOutcome::Deleted(deleted))
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub async fn save_customer(
        &self,
        session: Option<&Session>,
        mut customer: Customer,
    ) -> SyncResult<Customer> {
        let session = require_session(session)?;

        if customer.id.trim().is_empty() {
            customer.id = Uuid::new_v4().to_string();
        }
        validation::validate_customer(&customer)?;

        self.commit(session, [WriteOp::UpsertCustomer(customer.clone())].into_iter().collect())
            .await?;

        info!(owner = %session.owner(), id = %customer.id, "Customer saved");
        Ok(customer)
    }

    /// Deletes a customer. The walk-in customer is protected.
    pub async fn delete_customer(&self, session: Option<&Session>, customer: &Customer) -> SyncResult<()> {
        let session = require_session(session)?;
        if customer.is_walk_in() {
            return Err(CoreError::ProtectedCustomer(customer.name.clone()).into());
        }

        self.commit(
            session,
            [WriteOp::DeleteCustomer { id: customer.id.clone() }].into_iter().collect(),
        )
        .await?;

        info!(owner = %session.owner(), id = %customer.id, "Customer deleted");
        Ok(())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub async fn save_settings(&self, session: Option<&Session>, settings: Settings) -> SyncResult<Settings> {
        let session = require_session(session)?;
        validation::validate_settings(&settings)?;

        self.commit(session, [WriteOp::UpsertSettings(settings.clone())].into_iter().collect())
            .await?;

        info!(owner = %session.owner(), tax_rate = settings.tax_rate, "Settings saved");
        Ok(settings)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
