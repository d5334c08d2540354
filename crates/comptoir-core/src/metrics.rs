//! # Derived Metrics
//!
//! Stateless aggregations over the read-model collections. Every function
//! is total: empty input yields zero or an empty list, and nothing here is
//! cached, so callers simply recompute on each snapshot.
//!
//! ## What Counts as Revenue
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  documents ──► filter(type == facture && status != Annulée)             │
//! │                    │                                                    │
//! │       ┌────────────┼─────────────────┬──────────────────┐               │
//! │       ▼            ▼                 ▼                  ▼               │
//! │  total_invoiced  revenue_report   best_sellers    top customers         │
//! │  (Σ TTC)         (HT/TVA/COGS)    (Σ qty by ref)  (Σ TTC by name)       │
//! │                                                                         │
//! │  Quotes and delivery notes never count, whatever their status.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rankings
//! Grouping keeps first-occurrence order (an [`IndexMap`]) and the sort is
//! stable, so equal scores stay in the order their key first appeared.

use chrono::Datelike;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Customer, Product, SalesDocument};
use crate::{LOW_STOCK_THRESHOLD, RANKING_SIZE};

// =============================================================================
// Options
// =============================================================================

/// Tunables for the dashboard and report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsOptions {
    pub low_stock_threshold: i64,
    pub ranking_size: usize,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        MetricsOptions {
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            ranking_size: RANKING_SIZE,
        }
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// A product line of a ranking, keyed by reference code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductRanking {
    pub reference: String,
    /// Name of the first line seen with this reference.
    pub name: String,
    pub quantity: i64,
    /// Σ quantity × unit price, before tax.
    pub revenue: Money,
}

/// A customer line of a ranking, keyed by customer name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRanking {
    pub name: String,
    /// Σ total TTC.
    pub revenue: Money,
    pub invoice_count: usize,
}

/// Revenue, cost and profit over the counted invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub invoice_count: usize,
    pub total_ttc: Money,
    pub total_ht: Money,
    pub total_tva: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub gross_margin_percent: f64,
    pub items_sold: i64,
    pub top_products: Vec<ProductRanking>,
    pub top_customers: Vec<CustomerRanking>,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub product_count: usize,
    pub customer_count: usize,
    pub document_count: usize,
    pub stock_value: Money,
    pub total_invoiced: Money,
    pub low_stock: Vec<Product>,
    pub best_sellers: Vec<ProductRanking>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Σ sale price × stock.
pub fn stock_value(products: &[Product]) -> Money {
    products.iter().map(Product::stock_value).sum()
}

/// Products with `stock <= threshold`, lowest stock first.
pub fn low_stock(products: &[Product], threshold: i64) -> Vec<Product> {
    let mut low: Vec<Product> = products
        .iter()
        .filter(|p| p.stock <= threshold)
        .cloned()
        .collect();
    low.sort_by_key(|p| p.stock);
    low
}

// =============================================================================
// Revenue
// =============================================================================

/// Documents that count as revenue: non-cancelled invoices.
pub fn revenue_documents(documents: &[SalesDocument]) -> impl Iterator<Item = &SalesDocument> {
    documents.iter().filter(|doc| doc.counts_as_revenue())
}

/// Documents dated in the given calendar year (UTC).
pub fn documents_in_year(documents: &[SalesDocument], year: i32) -> Vec<SalesDocument> {
    documents
        .iter()
        .filter(|doc| doc.date.year() == year)
        .cloned()
        .collect()
}

/// Σ TTC over counted invoices.
pub fn total_invoiced(documents: &[SalesDocument]) -> Money {
    revenue_documents(documents).map(|doc| doc.total_ttc).sum()
}

/// Units sold per product reference, most sold first.
pub fn best_sellers(documents: &[SalesDocument], limit: usize) -> Vec<ProductRanking> {
    let mut ranking = group_by_reference(documents);
    ranking.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    ranking.truncate(limit);
    ranking
}

/// Pre-tax revenue per product reference, highest first.
pub fn top_products_by_revenue(documents: &[SalesDocument], limit: usize) -> Vec<ProductRanking> {
    let mut ranking = group_by_reference(documents);
    ranking.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    ranking.truncate(limit);
    ranking
}

/// TTC revenue per customer name, highest first.
pub fn top_customers_by_revenue(
    documents: &[SalesDocument],
    limit: usize,
) -> Vec<CustomerRanking> {
    let mut grouped: IndexMap<&str, CustomerRanking> = IndexMap::new();
    for doc in revenue_documents(documents) {
        let entry = grouped
            .entry(doc.customer.name.as_str())
            .or_insert_with(|| CustomerRanking {
                name: doc.customer.name.clone(),
                revenue: Money::zero(),
                invoice_count: 0,
            });
        entry.revenue += doc.total_ttc;
        entry.invoice_count += 1;
    }

    let mut ranking: Vec<CustomerRanking> = grouped.into_values().collect();
    ranking.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    ranking.truncate(limit);
    ranking
}

fn group_by_reference(documents: &[SalesDocument]) -> Vec<ProductRanking> {
    let mut grouped: IndexMap<&str, ProductRanking> = IndexMap::new();
    for item in revenue_documents(documents).flat_map(|doc| doc.items.iter()) {
        let entry = grouped
            .entry(item.reference.as_str())
            .or_insert_with(|| ProductRanking {
                reference: item.reference.clone(),
                name: item.name.clone(),
                quantity: 0,
                revenue: Money::zero(),
            });
        entry.quantity += item.quantity;
        entry.revenue += item.line_total();
    }
    grouped.into_values().collect()
}

/// Revenue, COGS and margin over the counted invoices.
///
/// COGS uses each product's current purchase price; a line whose product
/// has since been deleted is costed at its own unit sale price.
pub fn revenue_report(
    documents: &[SalesDocument],
    products: &[Product],
    options: MetricsOptions,
) -> RevenueReport {
    let invoices: Vec<&SalesDocument> = revenue_documents(documents).collect();

    let total_ttc: Money = invoices.iter().map(|doc| doc.total_ttc).sum();
    let total_ht: Money = invoices.iter().map(|doc| doc.total_ht).sum();
    let total_tva: Money = invoices.iter().map(|doc| doc.total_tva).sum();

    let mut cogs = Money::zero();
    let mut items_sold = 0;
    for item in invoices.iter().flat_map(|doc| doc.items.iter()) {
        let unit_cost = products
            .iter()
            .find(|p| p.id == item.product_id)
            .map_or(item.unit_price, |p| p.purchase_price);
        cogs += unit_cost * item.quantity;
        items_sold += item.quantity;
    }

    let gross_profit = total_ht - cogs;
    let gross_margin_percent = if total_ht.is_positive() {
        gross_profit.percent_of(total_ht)
    } else {
        0.0
    };

    RevenueReport {
        invoice_count: invoices.len(),
        total_ttc,
        total_ht,
        total_tva,
        cogs,
        gross_profit,
        gross_margin_percent,
        items_sold,
        top_products: top_products_by_revenue(documents, options.ranking_size),
        top_customers: top_customers_by_revenue(documents, options.ranking_size),
    }
}

/// Everything the dashboard shows, from one snapshot of the collections.
pub fn dashboard(
    products: &[Product],
    customers: &[Customer],
    documents: &[SalesDocument],
    options: MetricsOptions,
) -> DashboardSummary {
    DashboardSummary {
        product_count: products.len(),
        customer_count: customers.len(),
        document_count: documents.len(),
        stock_value: stock_value(products),
        total_invoiced: total_invoiced(documents),
        low_stock: low_stock(products, options.low_stock_threshold),
        best_sellers: best_sellers(documents, options.ranking_size),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomerSnapshot, DocumentItem, DocumentStatus, DocumentType};
    use chrono::{TimeZone, Utc};

    fn product(id: &str, purchase: i64, sale: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            reference: format!("REF-{}", id),
            name: format!("Produit {}", id),
            description: String::new(),
            purchase_price: Money::from_centimes(purchase),
            sale_price: Money::from_centimes(sale),
            stock,
        }
    }

    fn item(id: &str, qty: i64, price: i64) -> DocumentItem {
        DocumentItem {
            product_id: id.to_string(),
            reference: format!("REF-{}", id),
            name: format!("Produit {}", id),
            quantity: qty,
            unit_price: Money::from_centimes(price),
        }
    }

    fn doc(
        doc_type: DocumentType,
        status: DocumentStatus,
        customer: &str,
        items: Vec<DocumentItem>,
    ) -> SalesDocument {
        let ht: Money = items.iter().map(DocumentItem::line_total).sum();
        let tva = Money::from_centimes(ht.centimes() / 5);
        SalesDocument {
            id: format!("{}-{}", customer, items.len()),
            doc_type,
            reference: "FACTURE-1".to_string(),
            date: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            customer: CustomerSnapshot {
                customer_id: customer.to_string(),
                name: customer.to_string(),
                email: String::new(),
                phone: String::new(),
                address: String::new(),
                ice: None,
            },
            items,
            total_ht: ht,
            total_tva: tva,
            total_ttc: ht + tva,
            status,
            quote_ref: None,
        }
    }

    fn invoice(customer: &str, items: Vec<DocumentItem>) -> SalesDocument {
        doc(DocumentType::Invoice, DocumentStatus::Paid, customer, items)
    }

    #[test]
    fn test_empty_inputs() {
        assert!(stock_value(&[]).is_zero());
        assert!(low_stock(&[], 10).is_empty());
        assert!(total_invoiced(&[]).is_zero());
        assert!(best_sellers(&[], 5).is_empty());

        let report = revenue_report(&[], &[], MetricsOptions::default());
        assert_eq!(report.invoice_count, 0);
        assert_eq!(report.gross_margin_percent, 0.0);
    }

    #[test]
    fn test_stock_value_and_low_stock() {
        let products = vec![
            product("a", 0, 1_000, 12),
            product("b", 0, 500, 10),
            product("c", 0, 200, 3),
            product("d", 0, 100, 3),
        ];
        assert_eq!(stock_value(&products).centimes(), 12_000 + 5_000 + 600 + 300);

        let low = low_stock(&products, 10);
        let ids: Vec<&str> = low.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "b"]);
    }

    #[test]
    fn test_only_live_invoices_count() {
        let docs = vec![
            invoice("Alami", vec![item("a", 1, 10_000)]),
            doc(
                DocumentType::Invoice,
                DocumentStatus::Cancelled,
                "Alami",
                vec![item("a", 5, 10_000)],
            ),
            doc(
                DocumentType::Quote,
                DocumentStatus::Draft,
                "Alami",
                vec![item("a", 9, 10_000)],
            ),
            doc(
                DocumentType::DeliveryNote,
                DocumentStatus::Delivered,
                "Alami",
                vec![item("a", 9, 10_000)],
            ),
        ];

        assert_eq!(total_invoiced(&docs).centimes(), 12_000);
        assert_eq!(best_sellers(&docs, 5)[0].quantity, 1);
    }

    #[test]
    fn test_best_sellers_group_by_reference_with_stable_ties() {
        let docs = vec![
            invoice("X", vec![item("b", 2, 100), item("a", 2, 100)]),
            invoice("Y", vec![item("c", 5, 100), item("a", 1, 100)]),
        ];

        let ranking = best_sellers(&docs, 5);
        let refs: Vec<&str> = ranking.iter().map(|r| r.reference.as_str()).collect();
        // c=5, then a=3, then b=2
        assert_eq!(refs, vec!["REF-c", "REF-a", "REF-b"]);

        let tied = vec![invoice("X", vec![item("b", 2, 100), item("a", 2, 100)])];
        let refs: Vec<String> = best_sellers(&tied, 5)
            .into_iter()
            .map(|r| r.reference)
            .collect();
        assert_eq!(refs, vec!["REF-b", "REF-a"]);
    }

    #[test]
    fn test_grouping_is_commutative() {
        let first = invoice("X", vec![item("a", 2, 100), item("b", 1, 100)]);
        let second = invoice("Y", vec![item("b", 4, 100)]);

        let forward = best_sellers(&[first.clone(), second.clone()], 5);
        let backward = best_sellers(&[second, first], 5);

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_rankings_are_capped() {
        let items: Vec<DocumentItem> = (0..8)
            .map(|i| item(&i.to_string(), i + 1, 100))
            .collect();
        let docs = vec![invoice("X", items)];
        assert_eq!(best_sellers(&docs, 5).len(), 5);
        assert_eq!(best_sellers(&docs, 5)[0].quantity, 8);
    }

    #[test]
    fn test_revenue_report() {
        let products = vec![product("a", 6_000, 10_000, 5)];
        let docs = vec![
            invoice("Alami", vec![item("a", 2, 10_000)]),
            // product "gone" was deleted: costed at its sale price
            invoice("Bennani", vec![item("gone", 1, 3_000)]),
            invoice("Alami", vec![item("a", 1, 10_000)]),
        ];

        let report = revenue_report(&docs, &products, MetricsOptions::default());
        assert_eq!(report.invoice_count, 3);
        assert_eq!(report.total_ht.centimes(), 33_000);
        assert_eq!(report.cogs.centimes(), 3 * 6_000 + 3_000);
        assert_eq!(report.gross_profit.centimes(), 33_000 - 21_000);
        assert!((report.gross_margin_percent - 12_000.0 / 33_000.0 * 100.0).abs() < 1e-9);
        assert_eq!(report.items_sold, 4);
        assert_eq!(report.total_ttc, report.total_ht + report.total_tva);

        assert_eq!(report.top_products[0].reference, "REF-a");
        assert_eq!(report.top_products[0].revenue.centimes(), 30_000);
        assert_eq!(report.top_products[0].quantity, 3);

        assert_eq!(report.top_customers[0].name, "Alami");
        assert_eq!(report.top_customers[0].invoice_count, 2);
    }

    #[test]
    fn test_documents_in_year() {
        let mut old = invoice("X", vec![item("a", 1, 100)]);
        old.date = Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap();
        let docs = vec![old, invoice("Y", vec![item("a", 1, 100)])];

        assert_eq!(documents_in_year(&docs, 2024).len(), 1);
        assert_eq!(documents_in_year(&docs, 2023).len(), 1);
        assert!(documents_in_year(&docs, 2022).is_empty());
    }

    #[test]
    fn test_dashboard() {
        let products = vec![product("a", 0, 1_000, 2), product("b", 0, 1_000, 50)];
        let customers = vec![Customer::walk_in("c0")];
        let docs = vec![invoice("X", vec![item("a", 3, 1_000)])];

        let summary = dashboard(&products, &customers, &docs, MetricsOptions::default());
        assert_eq!(summary.product_count, 2);
        assert_eq!(summary.customer_count, 1);
        assert_eq!(summary.document_count, 1);
        assert_eq!(summary.stock_value.centimes(), 52_000);
        assert_eq!(summary.low_stock.len(), 1);
        assert_eq!(summary.best_sellers[0].quantity, 3);
    }
}
