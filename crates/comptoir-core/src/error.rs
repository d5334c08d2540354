//! # Error Types
//!
//! Domain-specific error types for comptoir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  comptoir-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Missing or malformed input                     │
//! │                                                                         │
//! │  comptoir-db errors                                                    │
//! │  └── DbError          - Store failures                                 │
//! │                                                                         │
//! │  comptoir-sync errors                                                  │
//! │  └── SyncError        - Workflow failures, RemoteUnavailable           │
//! │                                                                         │
//! │  backoffice errors                                                     │
//! │  └── ApiError         - What the user sees (code + message)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → ApiError              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::types::DocumentStatus;

// =============================================================================
// Stock Shortage
// =============================================================================

/// One cart or document line that cannot be served from current stock.
///
/// A product that no longer exists is reported with `available == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    pub product_id: String,
    pub name: String,
    pub requested: i64,
    pub available: i64,
}

impl std::fmt::Display for StockShortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (demandé: {}, dispo: {})",
            self.name, self.requested, self.available
        )
    }
}

fn join_shortages(lines: &[StockShortage]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// One or more lines ask for more than the authoritative stock.
    ///
    /// ## User Workflow
    /// ```text
    /// issue(invoice) with A×3, B×2
    ///      │
    ///      ▼
    /// authoritative stock: A=1, B=5
    ///      │
    ///      ▼
    /// InsufficientStock { lines: [A (demandé: 3, dispo: 1)] }
    ///      │
    ///      ▼
    /// nothing written, cart kept as is
    /// ```
    #[error("Stock insuffisant: {}", join_shortages(.lines))]
    InsufficientStock { lines: Vec<StockShortage> },

    /// The document is not in a status that allows the operation.
    #[error("Document {reference} is {status}, cannot {operation}")]
    InvalidDocumentStatus {
        reference: String,
        status: DocumentStatus,
        operation: String,
    },

    /// The operation needs a different kind of document.
    #[error("Document {reference} is not a {expected}")]
    WrongDocumentType { reference: String, expected: String },

    /// A document is already being issued from this cart.
    #[error("A document is already being issued")]
    IssueInProgress,

    /// The walk-in customer cannot be deleted.
    #[error("Customer '{0}' is protected and cannot be deleted")]
    ProtectedCustomer(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A document cannot be issued from an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// A document needs a customer.
    #[error("No customer selected")]
    NoCustomer,

    /// The caller has no authenticated, approved session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// An irreversible action was requested without confirmation.
    #[error("{action} requires confirmation")]
    ConfirmationRequired { action: String },

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed email, bad amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_names_every_line() {
        let err = CoreError::InsufficientStock {
            lines: vec![
                StockShortage {
                    product_id: "p1".to_string(),
                    name: "Câble 2.5mm".to_string(),
                    requested: 3,
                    available: 1,
                },
                StockShortage {
                    product_id: "p2".to_string(),
                    name: "Disjoncteur".to_string(),
                    requested: 2,
                    available: 0,
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Stock insuffisant: Câble 2.5mm (demandé: 3, dispo: 1), Disjoncteur (demandé: 2, dispo: 0)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::EmptyCart.to_string(), "Cart is empty");
        assert_eq!(
            ValidationError::Required {
                field: "name".to_string()
            }
            .to_string(),
            "name is required"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::NoCustomer.into();
        assert!(matches!(
            core_err,
            CoreError::Validation(ValidationError::NoCustomer)
        ));
    }
}
