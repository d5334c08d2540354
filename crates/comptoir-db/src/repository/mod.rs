//! # Repository Module
//!
//! Database repository implementations for Comptoir.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  comptoir-sync                                                          │
//! │       │                                                                 │
//! │       │  db.products().get_many(owner, &ids)        (reads)             │
//! │       │  db.commit(owner, &batch)                   (writes)            │
//! │       ▼                                                                 │
//! │  ProductRepository / CustomerRepository / DocumentRepository / ...      │
//! │  ├── list / get / count          ← pub, read from the pool              │
//! │  └── *_in(conn, ...)             ← pub(crate), run inside a batch tx    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog and stock
//! - [`customer::CustomerRepository`] - Customers
//! - [`document::DocumentRepository`] - Quotes, delivery notes, invoices
//! - [`settings::SettingsRepository`] - Company settings and tax rate
//! - [`profile::ProfileRepository`] - Access-control profiles

pub mod customer;
pub mod document;
pub mod product;
pub mod profile;
pub mod settings;
