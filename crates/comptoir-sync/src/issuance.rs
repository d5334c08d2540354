//! # Document Issuance
//!
//! Turns a cart into a persisted document, converts quotes into invoices
//! and applies manual status changes.
//!
//! ## Issue Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  issue(session, lines, customer, type, rate)                            │
//! │       │                                                                 │
//! │       ├── 1. preconditions: lines → customer → session                  │
//! │       ├── 2. build document (reference, status, totals, snapshot)       │
//! │       ├── 3. delivery note / invoice:                                   │
//! │       │        products_by_ids ──► check_stock (all shortfalls)         │
//! │       │                                                                 │
//! │       └── 4. commit ONE batch                                           │
//! │                ├── CreateDocument                                       │
//! │                └── AdjustStock(-qty) per product  (not for quotes)      │
//! │                                                                         │
//! │  Between 3 and 4 another writer may take the same units: the check is   │
//! │  optimistic. The batch itself is all or nothing.                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deleting or cancelling a document never puts stock back.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use comptoir_core::document::{self, DocumentHeader, ReferenceGenerator};
use comptoir_core::{
    CartLine, Customer, DocumentItem, DocumentStatus, DocumentType, Product, SalesDocument,
    TaxRate, ValidationError,
};
use comptoir_db::{WriteBatch, WriteOp};

use crate::error::SyncResult;
use crate::session::{require_session, Session};
use crate::store::RemoteStore;

/// Issuance and document lifecycle operations over a [`RemoteStore`].
pub struct Workflow {
    store: Arc<dyn RemoteStore>,
    references: ReferenceGenerator,
}

impl Workflow {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Workflow {
            store,
            references: ReferenceGenerator::new(),
        }
    }

    fn header(&self, doc_type: DocumentType) -> DocumentHeader {
        let date = Utc::now();
        DocumentHeader {
            id: Uuid::new_v4().to_string(),
            doc_type,
            reference: self.references.next(doc_type, date),
            date,
        }
    }

    /// Fetches the current rows of every product the items need and fails
    /// with every shortfall at once.
    async fn verify_stock(&self, owner: &str, items: &[DocumentItem]) -> SyncResult<()> {
        let ids: Vec<String> = document::stock_decrements(items)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let authoritative: Vec<Product> = self.store.products_by_ids(owner, &ids).await?;
        document::check_stock(items, &authoritative)?;
        Ok(())
    }

    fn push_decrements(batch: &mut WriteBatch, items: &[DocumentItem]) {
        for (product_id, quantity) in document::stock_decrements(items) {
            batch.push(WriteOp::AdjustStock {
                product_id,
                delta: -quantity,
            });
        }
    }

    // =========================================================================
    // Issue
    // =========================================================================

    /// Issues a quote, delivery note or invoice from the cart lines.
    ///
    /// ## Errors
    /// - `ValidationError::EmptyCart`, `NoCustomer`, `NotAuthenticated`
    ///   (checked in that order)
    /// - `SyncError::NotApproved` for a pending account
    /// - `CoreError::InsufficientStock` listing every short line
    /// - `SyncError::RemoteUnavailable` when the store cannot be reached
    pub async fn issue(
        &self,
        session: Option<&Session>,
        lines: &[CartLine],
        customer: Option<&Customer>,
        doc_type: DocumentType,
        rate: TaxRate,
    ) -> SyncResult<SalesDocument> {
        if lines.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        let customer = customer.ok_or(ValidationError::NoCustomer)?;
        let session = require_session(session)?;
        let owner = session.owner();

        let items: Vec<DocumentItem> = lines.iter().map(CartLine::to_item).collect();
        let document = document::build_document(self.header(doc_type), customer, items, rate)?;

        if doc_type.consumes_stock() {
            if let Err(e) = self.verify_stock(owner, &document.items).await {
                warn!(owner, reference = %document.reference, error = %e, "Issue refused");
                return Err(e);
            }
        }

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::CreateDocument(document.clone()));
        if doc_type.consumes_stock() {
            Self::push_decrements(&mut batch, &document.items);
        }

        self.store.commit(owner, &batch).await?;

        info!(
            owner,
            reference = %document.reference,
            doc_type = %document.doc_type,
            total_ttc = document.total_ttc.centimes(),
            "Document created"
        );
        Ok(document)
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Converts a Draft quote into a Paid invoice, marking the quote
    /// Converted and taking the stock, in one batch.
    ///
    /// The Draft check reads the caller's copy of the quote; two concurrent
    /// conversions of the same quote can both pass it.
    pub async fn convert_quote(
        &self,
        session: Option<&Session>,
        quote: &SalesDocument,
    ) -> SyncResult<SalesDocument> {
        let session = require_session(session)?;
        let owner = session.owner();

        let invoice = document::invoice_from_quote(quote, self.header(DocumentType::Invoice))?;

        if let Err(e) = self.verify_stock(owner, &invoice.items).await {
            warn!(owner, quote = %quote.reference, error = %e, "Conversion refused");
            return Err(e);
        }

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::CreateDocument(invoice.clone()));
        batch.push(WriteOp::UpdateDocumentStatus {
            id: quote.id.clone(),
            status: DocumentStatus::Converted,
        });
        Self::push_decrements(&mut batch, &invoice.items);

        self.store.commit(owner, &batch).await?;

        info!(
            owner,
            quote = %quote.reference,
            invoice = %invoice.reference,
            "Quote converted"
        );
        Ok(invoice)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Marks a document Cancelled. Stock is not restored.
    pub async fn cancel_document(
        &self,
        session: Option<&Session>,
        document: &SalesDocument,
    ) -> SyncResult<()> {
        let session = require_session(session)?;
        document::ensure_can_cancel(document)?;

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpdateDocumentStatus {
            id: document.id.clone(),
            status: DocumentStatus::Cancelled,
        });
        self.store.commit(session.owner(), &batch).await?;

        info!(owner = %session.owner(), reference = %document.reference, "Document cancelled");
        Ok(())
    }

    /// Deletes a document. Stock is not restored.
    pub async fn delete_document(&self, session: Option<&Session>, id: &str) -> SyncResult<()> {
        let session = require_session(session)?;

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::DeleteDocument { id: id.to_string() });
        self.store.commit(session.owner(), &batch).await?;

        info!(owner = %session.owner(), id, "Document deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::testing::{flaky_store, product, seed_products, session, stock_of, OWNER};
    use comptoir_core::{Cart, CoreError};

    const TVA_20: TaxRate = TaxRate::from_bps(2000);

    fn customer() -> Customer {
        Customer::walk_in("walk-in")
    }

    async fn documents(store: &crate::testing::FlakyStore) -> Vec<SalesDocument> {
        store.inner().database().documents().list(OWNER).await.unwrap()
    }

    #[tokio::test]
    async fn test_invoice_within_stock_decrements_and_persists() {
        let store = flaky_store().await;
        let a = product("a", 10_000, 5);
        seed_products(&store, &[a.clone()]).await;
        let workflow = Workflow::new(store.clone());

        let mut cart = Cart::new();
        for _ in 0..3 {
            cart.add(&a);
        }
        let lines = cart.begin_issue().unwrap();

        let invoice = workflow
            .issue(Some(&session()), &lines, Some(&customer()), DocumentType::Invoice, TVA_20)
            .await
            .unwrap();
        cart.finish_issue(true);

        assert!(cart.is_empty());
        assert_eq!(stock_of(&store, "a").await, 2);
        assert_eq!(invoice.status, DocumentStatus::Paid);
        assert_eq!(invoice.total_ht.centimes(), 30_000);
        assert_eq!(invoice.total_ttc.centimes(), 36_000);

        let stored = documents(&store).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], invoice);
    }

    #[tokio::test]
    async fn test_delivery_note_is_delivered_and_decrements_each_line() {
        let store = flaky_store().await;
        let a = product("a", 2_500, 5);
        let b = product("b", 4_000, 4);
        seed_products(&store, &[a.clone(), b.clone()]).await;
        let workflow = Workflow::new(store.clone());

        let mut cart = Cart::new();
        cart.add(&a);
        cart.add(&a);
        cart.add(&b);
        let lines = cart.begin_issue().unwrap();

        let note = workflow
            .issue(Some(&session()), &lines, Some(&customer()), DocumentType::DeliveryNote, TVA_20)
            .await
            .unwrap();

        assert_eq!(note.status, DocumentStatus::Delivered);
        assert_eq!(note.doc_type, DocumentType::DeliveryNote);
        assert_eq!(note.total_ht.centimes(), 9_000);
        assert_eq!(stock_of(&store, "a").await, 3);
        assert_eq!(stock_of(&store, "b").await, 3);
        assert_eq!(documents(&store).await, vec![note]);
    }

    #[tokio::test]
    async fn test_shortfall_writes_nothing_and_lists_every_line() {
        let store = flaky_store().await;
        let a = product("a", 1_000, 5);
        let b = product("b", 2_000, 4);
        seed_products(&store, &[a.clone(), b.clone()]).await;
        let workflow = Workflow::new(store.clone());

        let mut cart = Cart::new();
        cart.add(&a);
        cart.set_quantity(&[a.clone()], "a", 5);
        cart.add(&b);
        cart.set_quantity(&[b.clone()], "b", 4);

        // Someone else sold most of both products since the cart was built.
        let batch: WriteBatch = vec![
            WriteOp::AdjustStock { product_id: "a".into(), delta: -4 },
            WriteOp::AdjustStock { product_id: "b".into(), delta: -3 },
        ]
        .into_iter()
        .collect();
        store.inner().commit(OWNER, &batch).await.unwrap();

        let err = workflow
            .issue(
                Some(&session()),
                cart.lines(),
                Some(&customer()),
                DocumentType::DeliveryNote,
                TVA_20,
            )
            .await
            .unwrap_err();

        match err {
            SyncError::Core(CoreError::InsufficientStock { lines }) => {
                assert_eq!(lines.len(), 2);
                assert_eq!((lines[0].requested, lines[0].available), (5, 1));
                assert_eq!((lines[1].requested, lines[1].available), (4, 1));
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(stock_of(&store, "a").await, 1);
        assert_eq!(stock_of(&store, "b").await, 1);
        assert!(documents(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_product_counts_as_zero_available() {
        let store = flaky_store().await;
        let a = product("a", 1_000, 5);
        let workflow = Workflow::new(store.clone());

        let mut cart = Cart::new();
        cart.add(&a);

        let err = workflow
            .issue(Some(&session()), cart.lines(), Some(&customer()), DocumentType::Invoice, TVA_20)
            .await
            .unwrap_err();

        match err {
            SyncError::Core(CoreError::InsufficientStock { lines }) => {
                assert_eq!(lines[0].available, 0);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quote_then_conversion() {
        let store = flaky_store().await;
        let b = product("b", 5_000, 1);
        seed_products(&store, &[b.clone()]).await;
        let workflow = Workflow::new(store.clone());

        let mut cart = Cart::new();
        cart.add(&b);
        let quote = workflow
            .issue(Some(&session()), cart.lines(), Some(&customer()), DocumentType::Quote, TVA_20)
            .await
            .unwrap();

        assert_eq!(quote.status, DocumentStatus::Draft);
        assert_eq!(stock_of(&store, "b").await, 1);

        let invoice = workflow.convert_quote(Some(&session()), &quote).await.unwrap();
        assert_eq!(invoice.doc_type, DocumentType::Invoice);
        assert_eq!(invoice.status, DocumentStatus::Paid);
        assert_eq!(invoice.quote_ref.as_deref(), Some(quote.reference.as_str()));
        assert_eq!(invoice.total_ttc, quote.total_ttc);
        assert_ne!(invoice.reference, quote.reference);
        assert_eq!(stock_of(&store, "b").await, 0);

        let stored = store
            .inner()
            .database()
            .documents()
            .get(OWNER, &quote.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, DocumentStatus::Converted);

        // The stored quote is no longer Draft.
        let again = workflow.convert_quote(Some(&session()), &stored).await;
        assert!(matches!(
            again,
            Err(SyncError::Core(CoreError::InvalidDocumentStatus { .. }))
        ));
    }

    #[tokio::test]
    async fn test_preconditions_in_order() {
        let store = flaky_store().await;
        let a = product("a", 1_000, 5);
        let workflow = Workflow::new(store);

        let err = workflow
            .issue(None, &[], None, DocumentType::Invoice, TVA_20)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Core(CoreError::Validation(ValidationError::EmptyCart))
        ));

        let mut cart = Cart::new();
        cart.add(&a);
        let err = workflow
            .issue(None, cart.lines(), None, DocumentType::Invoice, TVA_20)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Core(CoreError::Validation(ValidationError::NoCustomer))
        ));

        let err = workflow
            .issue(None, cart.lines(), Some(&customer()), DocumentType::Invoice, TVA_20)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Core(CoreError::Validation(ValidationError::NotAuthenticated))
        ));
    }

    #[tokio::test]
    async fn test_offline_issue_is_remote_unavailable() {
        let store = flaky_store().await;
        let a = product("a", 1_000, 5);
        seed_products(&store, &[a.clone()]).await;
        let workflow = Workflow::new(store.clone());

        let mut cart = Cart::new();
        cart.add(&a);
        store.set_offline(true);

        let err = workflow
            .issue(Some(&session()), cart.lines(), Some(&customer()), DocumentType::Quote, TVA_20)
            .await
            .unwrap_err();
        assert!(err.is_remote_unavailable());

        store.set_offline(false);
        assert!(documents(&store).await.is_empty());
        assert_eq!(stock_of(&store, "a").await, 5);
    }

    #[tokio::test]
    async fn test_cancel_and_delete_never_restock() {
        let store = flaky_store().await;
        let a = product("a", 1_000, 5);
        seed_products(&store, &[a.clone()]).await;
        let workflow = Workflow::new(store.clone());

        let mut cart = Cart::new();
        cart.add(&a);
        cart.add(&a);
        let invoice = workflow
            .issue(Some(&session()), cart.lines(), Some(&customer()), DocumentType::Invoice, TVA_20)
            .await
            .unwrap();
        assert_eq!(stock_of(&store, "a").await, 3);

        workflow.cancel_document(Some(&session()), &invoice).await.unwrap();
        assert_eq!(stock_of(&store, "a").await, 3);

        let mut cancelled = invoice.clone();
        cancelled.status = DocumentStatus::Cancelled;
        assert!(workflow.cancel_document(Some(&session()), &cancelled).await.is_err());

        workflow.delete_document(Some(&session()), &invoice.id).await.unwrap();
        assert_eq!(stock_of(&store, "a").await, 3);
        assert!(documents(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_references_are_unique_for_rapid_issues() {
        let store = flaky_store().await;
        let a = product("a", 1_000, 50);
        seed_products(&store, &[a.clone()]).await;
        let workflow = Workflow::new(store.clone());

        let mut cart = Cart::new();
        cart.add(&a);
        for _ in 0..5 {
            workflow
                .issue(Some(&session()), cart.lines(), Some(&customer()), DocumentType::Invoice, TVA_20)
                .await
                .unwrap();
        }

        assert_eq!(documents(&store).await.len(), 5);
        assert_eq!(stock_of(&store, "a").await, 45);
    }
}
