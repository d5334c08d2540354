//! # Commands Module
//!
//! Everything the presentation layer can ask of the back office, one
//! module per screen.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── session.rs    ◄─── Sign in / sign out
//! ├── cart.rs       ◄─── Point-of-sale cart
//! ├── documents.rs  ◄─── Issue, convert, cancel, delete, details
//! ├── products.rs   ◄─── Stock screen and search
//! ├── customers.rs  ◄─── Customer screen
//! ├── settings.rs   ◄─── Company identity and tax rate
//! └── reports.rs    ◄─── Dashboard and annual report
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  async fn issue_document(                                               │
//! │      state: &AppState,        ◄── shared state                          │
//! │      doc_type: DocumentType,  ◄── from the caller                       │
//! │      customer_id: Option<&str>,                                         │
//! │  ) -> ApiResult<SalesDocument>                                          │
//! │                                                                         │
//! │  Reads come from the session's ReadModel (last published snapshot).    │
//! │  Writes go through comptoir-sync with the explicit Session.            │
//! │  Irreversible actions take `confirmed: bool`.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod customers;
pub mod documents;
pub mod products;
pub mod reports;
pub mod session;
pub mod settings;
