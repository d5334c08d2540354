//! # Domain Types
//!
//! Core domain types used throughout Comptoir.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────┐   │
//! │  │    Product      │   │    SalesDocument    │   │    Customer     │   │
//! │  │  ─────────────  │   │  ─────────────────  │   │  ─────────────  │   │
//! │  │  id (UUID)      │   │  id (UUID)          │   │  id (UUID)      │   │
//! │  │  reference      │   │  type devis/bon/fac │   │  name           │   │
//! │  │  purchase_price │   │  reference          │   │  email, phone   │   │
//! │  │  sale_price     │   │  customer snapshot ─┼──►│  address, ICE   │   │
//! │  │  stock          │◄──┼─ items (frozen)     │   └─────────────────┘   │
//! │  └─────────────────┘   │  totals HT/TVA/TTC  │                         │
//! │                        │  status             │   ┌─────────────────┐   │
//! │                        │  quote_ref          │   │    Settings     │   │
//! │                        └─────────────────────┘   │  company info   │   │
//! │                                                  │  tax_rate 0.20  │   │
//! │                                                  └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Documents never point at live product or customer rows for display. The
//! customer and every line are copied at issuance, so later edits (a price
//! change, a renamed customer) leave issued documents untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, TaxRate};

// =============================================================================
// Product
// =============================================================================

/// A stock item that can be put on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human reference code, e.g. `PRD-482913057`.
    pub reference: String,

    pub name: String,

    pub description: String,

    /// Cost price, used for COGS.
    pub purchase_price: Money,

    /// Sale price before tax.
    pub sale_price: Money,

    /// Units on hand. Expected to stay >= 0 but not enforced at write time.
    pub stock: i64,
}

impl Product {
    /// Reference for a product saved without one:
    /// `PRD-{last 6 digits of millis}{3 digits of entropy}`.
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::Product;
    ///
    /// assert_eq!(Product::generate_reference(1_709_812_345_678, 42), "PRD-345678042");
    /// ```
    pub fn generate_reference(now_millis: i64, entropy: u32) -> String {
        format!(
            "PRD-{:06}{:03}",
            now_millis.rem_euclid(1_000_000),
            entropy % 1_000
        )
    }

    /// Value of the units on hand at sale price.
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.sale_price * self.stock
    }

    /// Gross margin on the sale price, in percent.
    ///
    /// `(sale - purchase) / sale × 100`, or 0 when the sale price is zero or
    /// negative.
    pub fn margin_percent(&self) -> f64 {
        if !self.sale_price.is_positive() {
            return 0.0;
        }
        (self.sale_price - self.purchase_price).percent_of(self.sale_price)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Name of the protected walk-in customer.
pub const WALK_IN_CUSTOMER_NAME: &str = "Client de Passage";

/// A customer that documents can be issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Moroccan company identifier (ICE), opaque.
    #[serde(default)]
    pub ice: Option<String>,
}

impl Customer {
    /// The walk-in customer seeded on first run and preselected at the
    /// point of sale.
    pub fn walk_in(id: impl Into<String>) -> Self {
        Customer {
            id: id.into(),
            name: WALK_IN_CUSTOMER_NAME.to_string(),
            email: "contact@client.com".to_string(),
            phone: "N/A".to_string(),
            address: "Comptoir".to_string(),
            ice: None,
        }
    }

    /// True for the protected walk-in customer.
    pub fn is_walk_in(&self) -> bool {
        self.name == WALK_IN_CUSTOMER_NAME
    }
}

/// Customer fields frozen into a document at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub ice: Option<String>,
}

impl From<&Customer> for CustomerSnapshot {
    fn from(customer: &Customer) -> Self {
        CustomerSnapshot {
            customer_id: customer.id.clone(),
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            ice: customer.ice.clone(),
        }
    }
}

// =============================================================================
// Document Type
// =============================================================================

/// Kind of sales document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum DocumentType {
    /// Devis: reserves no stock.
    #[serde(rename = "devis")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "devis"))]
    Quote,
    /// Bon de livraison: consumes stock at issuance.
    #[serde(rename = "bon")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "bon"))]
    DeliveryNote,
    /// Facture: consumes stock at issuance or at quote conversion.
    #[serde(rename = "facture")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "facture"))]
    Invoice,
}

impl DocumentType {
    /// Wire/storage code.
    pub const fn code(&self) -> &'static str {
        match self {
            DocumentType::Quote => "devis",
            DocumentType::DeliveryNote => "bon",
            DocumentType::Invoice => "facture",
        }
    }

    /// Prefix of the human reference (`FACTURE-1709821320000`).
    pub const fn reference_prefix(&self) -> &'static str {
        match self {
            DocumentType::Quote => "DEVIS",
            DocumentType::DeliveryNote => "BON",
            DocumentType::Invoice => "FACTURE",
        }
    }

    /// Title printed on the document.
    pub const fn label(&self) -> &'static str {
        match self {
            DocumentType::Quote => "Devis",
            DocumentType::DeliveryNote => "Bon de livraison",
            DocumentType::Invoice => "Facture",
        }
    }

    /// Whether issuing this type takes units out of stock.
    pub const fn consumes_stock(&self) -> bool {
        !matches!(self, DocumentType::Quote)
    }

    /// Status a freshly issued document of this type starts in.
    pub const fn initial_status(&self) -> DocumentStatus {
        match self {
            DocumentType::Quote => DocumentStatus::Draft,
            DocumentType::DeliveryNote => DocumentStatus::Delivered,
            DocumentType::Invoice => DocumentStatus::Paid,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "devis" | "quote" => Ok(DocumentType::Quote),
            "bon" | "delivery-note" | "delivery_note" => Ok(DocumentType::DeliveryNote),
            "facture" | "invoice" => Ok(DocumentType::Invoice),
            _ => Err(format!("unknown document type: {}", s)),
        }
    }
}

// =============================================================================
// Document Status
// =============================================================================

/// Lifecycle status of a sales document.
///
/// ```text
///   devis:    Brouillon ──convert──► Converti (terminal)
///                 │
///   bon:      Livré ────┐
///                       ├──cancel──► Annulée (terminal)
///   facture:  Payée ────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
pub enum DocumentStatus {
    #[serde(rename = "Brouillon")]
    Draft,
    #[serde(rename = "Converti")]
    Converted,
    #[serde(rename = "Payée")]
    Paid,
    #[serde(rename = "Annulée")]
    Cancelled,
    #[serde(rename = "Livré")]
    Delivered,
}

impl DocumentStatus {
    /// Label shown to the user.
    pub const fn label(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "Brouillon",
            DocumentStatus::Converted => "Converti",
            DocumentStatus::Paid => "Payée",
            DocumentStatus::Cancelled => "Annulée",
            DocumentStatus::Delivered => "Livré",
        }
    }

    /// Manual cancellation is allowed from every non-terminal status.
    pub const fn can_cancel(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Draft | DocumentStatus::Delivered | DocumentStatus::Paid
        )
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Converted | DocumentStatus::Cancelled)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Document Item
// =============================================================================

/// A document line: product fields frozen at the moment of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub product_id: String,
    pub reference: String,
    pub name: String,
    /// Always >= 1.
    pub quantity: i64,
    pub unit_price: Money,
}

impl DocumentItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

// =============================================================================
// Sales Document
// =============================================================================

/// A quote, delivery note or invoice.
///
/// Items and totals are immutable after creation; only `status` changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesDocument {
    pub id: String,

    #[serde(rename = "type")]
    pub doc_type: DocumentType,

    /// Human reference, `{TYPE}-{millis}`.
    pub reference: String,

    #[ts(as = "String")]
    pub date: DateTime<Utc>,

    pub customer: CustomerSnapshot,

    pub items: Vec<DocumentItem>,

    pub total_ht: Money,
    pub total_tva: Money,
    pub total_ttc: Money,

    pub status: DocumentStatus,

    /// For invoices converted from a quote: the quote's reference.
    #[serde(default)]
    pub quote_ref: Option<String>,
}

impl SalesDocument {
    /// Non-cancelled invoices are the only documents that count as revenue.
    pub fn counts_as_revenue(&self) -> bool {
        self.doc_type == DocumentType::Invoice && self.status != DocumentStatus::Cancelled
    }

    /// Total number of units across all lines.
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Company identity printed on every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyInfo {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub logo_url: String,
    pub ice: String,
    /// Registre de commerce.
    pub rc: String,
    /// Identifiant fiscal.
    pub if_fiscal: String,
    pub cnss: String,
    pub patente: String,
    pub rib: String,
    /// Legal form line, e.g. capital.
    pub legal: String,
}

impl Default for CompanyInfo {
    fn default() -> Self {
        CompanyInfo {
            name: "OULAD ALLOU".to_string(),
            address: "RUE 58 N° 3005 1ER ETAGE HAY EL AMAL, KÉNITRA".to_string(),
            email: String::new(),
            phone: String::new(),
            website: String::new(),
            logo_url: String::new(),
            ice: "003435101000084".to_string(),
            rc: "79999".to_string(),
            if_fiscal: String::new(),
            cnss: String::new(),
            patente: String::new(),
            rib: String::new(),
            legal: "SARL AU au capital de 100 000,00 MAD".to_string(),
        }
    }
}

/// Per-owner business settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub company_info: CompanyInfo,
    /// Tax rate as a fraction (0.20 = 20%).
    pub tax_rate: f64,
}

impl Settings {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_fraction(self.tax_rate)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            company_info: CompanyInfo::default(),
            tax_rate: 0.20,
        }
    }
}

// =============================================================================
// Profiles
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// Access-control record for an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub email: String,
    pub approved: bool,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub last_login: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
