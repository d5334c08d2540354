//! # API Error Type
//!
//! Unified error type for back office commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Comptoir                               │
//! │                                                                         │
//! │  Command Function → Result<T, ApiError>                                 │
//! │         │                                                               │
//! │         ├── ValidationError ──► CoreError ──┐                           │
//! │         │                                   ▼                           │
//! │         ├── DbError ──────────────────► SyncError ──► ApiError          │
//! │         │                                              { code,          │
//! │         │                                                message }      │
//! │         ▼                                                               │
//! │  Success                                                                │
//! │                                                                         │
//! │  Store failures are logged here with their detail and reach the user   │
//! │  as a generic notice. Nothing is retried.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::error;

use comptoir_core::{CoreError, StockShortage, ValidationError};
use comptoir_sync::SyncError;

use crate::config::ConfigError;

/// Error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Stock insuffisant: Câble 2.5mm (demandé: 3, dispo: 1)",
///   "shortages": [{ "productId": "p1", "name": "Câble 2.5mm", "requested": 3, "available": 1 }]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Every short line, for `INSUFFICIENT_STOCK`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shortages: Vec<StockShortage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// No signed-in session
    NotAuthenticated,

    /// Account awaiting approval
    NotApproved,

    /// Irreversible action without confirmation
    ConfirmationRequired,

    /// Not enough stock for one or more lines
    InsufficientStock,

    /// Business rule refused the operation (status, protected record)
    BusinessLogic,

    /// The store could not be reached
    RemoteUnavailable,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            shortages: Vec::new(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let code = match err {
            ValidationError::NotAuthenticated => ErrorCode::NotAuthenticated,
            ValidationError::ConfirmationRequired { .. } => ErrorCode::ConfirmationRequired,
            _ => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::InsufficientStock { lines } => {
                let mut api = ApiError::new(
                    ErrorCode::InsufficientStock,
                    CoreError::InsufficientStock { lines: lines.clone() }.to_string(),
                );
                api.shortages = lines;
                api
            }
            other @ (CoreError::InvalidDocumentStatus { .. }
            | CoreError::WrongDocumentType { .. }
            | CoreError::IssueInProgress
            | CoreError::ProtectedCustomer(_)) => {
                ApiError::new(ErrorCode::BusinessLogic, other.to_string())
            }
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Core(e) => e.into(),
            SyncError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            SyncError::NotApproved(email) => ApiError::new(
                ErrorCode::NotApproved,
                format!("Le compte {} est en attente d'approbation", email),
            ),
            SyncError::RemoteUnavailable(detail) => {
                // Log the actual error but return a generic message
                error!("Remote store unavailable: {}", detail);
                ApiError::new(
                    ErrorCode::RemoteUnavailable,
                    "Service indisponible, veuillez réessayer",
                )
            }
            SyncError::SubscriptionClosed => {
                error!("Subscription closed while in use");
                ApiError::internal("Synchronisation interrompue")
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        error!("Configuration error: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for commands.
pub type ApiResult<T> = Result<T, ApiError>;
