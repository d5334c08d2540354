//! # comptoir-core: Pure Business Logic for Comptoir
//!
//! Everything that decides a number, a bound or a status lives here, as
//! plain functions over plain data. The database, the read model and the
//! command layer only move values in and out of this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comptoir Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Presentation layer (free to vary per platform)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         backoffice commands  ◄──  comptoir-sync read model      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ comptoir-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ │   │
//! │  │   │  money  │ │ format  │ │  cart   │ │ metrics │ │ document │ │   │
//! │  │   │ Money   │ │ MAD     │ │ bounds  │ │ reports │ │ build    │ │   │
//! │  │   │ TaxRate │ │ words   │ │ totals  │ │ top-N   │ │ check    │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, SalesDocument, Settings)
//! - [`money`] - Money in centimes and TaxRate in basis points
//! - [`format`] - Currency strings, dates, amounts in French words
//! - [`cart`] - The sale builder
//! - [`metrics`] - Dashboard and annual report aggregations
//! - [`document`] - Document building, stock checks, quote conversion
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation for products and customers
//!
//! ## Example Usage
//!
//! ```rust
//! use comptoir_core::money::{Money, TaxRate};
//!
//! let subtotal = Money::from_centimes(10_000); // 100,00 MAD
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(2000));
//! assert_eq!(tax.centimes(), 2_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod document;
pub mod error;
pub mod format;
pub mod metrics;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartPhase, CartTotals};
pub use error::{CoreError, CoreResult, StockShortage, ValidationError};
pub use money::{Money, TaxRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Products at or below this stock level show up in the low-stock list.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Size of every "top N" ranking (best sellers, top customers, ...).
pub const RANKING_SIZE: usize = 5;
