//! # Document Building
//!
//! The pure half of the issuance workflow: turning cart lines into a
//! document, checking lines against authoritative stock, and deriving an
//! invoice from a quote. Reading stock and writing the result belong to
//! `comptoir-sync`.
//!
//! ## Issuance Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  cart lines ──► build_document ──► SalesDocument                        │
//! │                   │   reference  = {TYPE}-{millis}                      │
//! │                   │   status     = type.initial_status()                │
//! │                   │   HT         = Σ unit × qty                         │
//! │                   │   TVA        = round(HT × rate)                     │
//! │                   │   TTC        = HT + TVA                             │
//! │                   ▼                                                     │
//! │  check_stock(items, authoritative products)                             │
//! │      ├── every line served ──► Ok                                       │
//! │      └── any shortfall ──────► InsufficientStock { all short lines }    │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │  stock_decrements(items) ──► [(product_id, qty)] for the write batch    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::error::{CoreError, CoreResult, StockShortage, ValidationError};
use crate::money::{Money, TaxRate};
use crate::types::{
    Customer, CustomerSnapshot, DocumentItem, DocumentStatus, DocumentType, Product,
    SalesDocument,
};

// =============================================================================
// References
// =============================================================================

/// Produces `{TYPE}-{millis}` references that never repeat within a process.
///
/// When two documents are issued in the same millisecond (or the clock goes
/// backwards) the second one takes the previous value + 1.
#[derive(Debug, Default)]
pub struct ReferenceGenerator {
    last_millis: AtomicI64,
}

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next reference for a document issued at `now`.
    pub fn next(&self, doc_type: DocumentType, now: DateTime<Utc>) -> String {
        let wanted = now.timestamp_millis();
        let mut current = self.last_millis.load(Ordering::Relaxed);
        loop {
            let candidate = wanted.max(current + 1);
            match self.last_millis.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("{}-{}", doc_type.reference_prefix(), candidate),
                Err(observed) => current = observed,
            }
        }
    }
}

// =============================================================================
// Building
// =============================================================================

/// Identity of a document about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub id: String,
    pub doc_type: DocumentType,
    pub reference: String,
    pub date: DateTime<Utc>,
}

/// HT, TVA and TTC for a list of items.
pub fn totals_for(items: &[DocumentItem], rate: TaxRate) -> (Money, Money, Money) {
    let total_ht: Money = items.iter().map(DocumentItem::line_total).sum();
    let total_tva = total_ht.calculate_tax(rate);
    (total_ht, total_tva, total_ht + total_tva)
}

/// Builds a new document from frozen items.
///
/// ## Errors
/// - `ValidationError::EmptyCart` when `items` is empty
/// - `ValidationError::OutOfRange` when a line has quantity < 1
pub fn build_document(
    header: DocumentHeader,
    customer: &Customer,
    items: Vec<DocumentItem>,
    rate: TaxRate,
) -> CoreResult<SalesDocument> {
    if items.is_empty() {
        return Err(ValidationError::EmptyCart.into());
    }
    if items.iter().any(|item| item.quantity < 1) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::MAX,
        }
        .into());
    }

    let (total_ht, total_tva, total_ttc) = totals_for(&items, rate);

    Ok(SalesDocument {
        id: header.id,
        doc_type: header.doc_type,
        reference: header.reference,
        date: header.date,
        customer: CustomerSnapshot::from(customer),
        items,
        total_ht,
        total_tva,
        total_ttc,
        status: header.doc_type.initial_status(),
        quote_ref: None,
    })
}

/// Derives the invoice for a Draft quote.
///
/// Customer, items and totals are copied unchanged; the invoice gets its own
/// id, reference and date, status Paid, and points back at the quote.
pub fn invoice_from_quote(quote: &SalesDocument, header: DocumentHeader) -> CoreResult<SalesDocument> {
    if quote.doc_type != DocumentType::Quote {
        return Err(CoreError::WrongDocumentType {
            reference: quote.reference.clone(),
            expected: DocumentType::Quote.label().to_string(),
        });
    }
    if quote.status != DocumentStatus::Draft {
        return Err(CoreError::InvalidDocumentStatus {
            reference: quote.reference.clone(),
            status: quote.status,
            operation: "convert".to_string(),
        });
    }

    Ok(SalesDocument {
        id: header.id,
        doc_type: DocumentType::Invoice,
        reference: header.reference,
        date: header.date,
        customer: quote.customer.clone(),
        items: quote.items.clone(),
        total_ht: quote.total_ht,
        total_tva: quote.total_tva,
        total_ttc: quote.total_ttc,
        status: DocumentStatus::Paid,
        quote_ref: Some(quote.reference.clone()),
    })
}

/// Checks that a manual cancellation is allowed.
pub fn ensure_can_cancel(document: &SalesDocument) -> CoreResult<()> {
    if document.status.can_cancel() {
        Ok(())
    } else {
        Err(CoreError::InvalidDocumentStatus {
            reference: document.reference.clone(),
            status: document.status,
            operation: "cancel".to_string(),
        })
    }
}

// =============================================================================
// Stock
// =============================================================================

/// Quantity per product across all items, in first-occurrence order.
pub fn stock_decrements(items: &[DocumentItem]) -> Vec<(String, i64)> {
    let mut per_product: IndexMap<&str, i64> = IndexMap::new();
    for item in items {
        *per_product.entry(item.product_id.as_str()).or_insert(0) += item.quantity;
    }
    per_product
        .into_iter()
        .map(|(id, qty)| (id.to_string(), qty))
        .collect()
}

/// Checks every product the items need against authoritative stock.
///
/// All shortfalls are collected before failing. A product missing from
/// `authoritative` is treated as having zero units.
pub fn check_stock(items: &[DocumentItem], authoritative: &[Product]) -> CoreResult<()> {
    let shortages: Vec<StockShortage> = stock_decrements(items)
        .into_iter()
        .filter_map(|(product_id, requested)| {
            let product = authoritative.iter().find(|p| p.id == product_id);
            let available = product.map_or(0, |p| p.stock);
            if requested <= available {
                return None;
            }
            let name = product
                .map(|p| p.name.clone())
                .or_else(|| {
                    items
                        .iter()
                        .find(|item| item.product_id == product_id)
                        .map(|item| item.name.clone())
                })
                .unwrap_or_else(|| product_id.clone());
            Some(StockShortage {
                product_id,
                name,
                requested,
                available,
            })
        })
        .collect();

    if shortages.is_empty() {
        Ok(())
    } else {
        Err(CoreError::InsufficientStock { lines: shortages })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
