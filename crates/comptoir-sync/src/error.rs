//! # Sync Error Types
//!
//! Error types for the synchronization shell and the workflows it runs.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐  │
//! │  │  Business rule  │  │     Store       │  │     Session             │  │
//! │  │                 │  │                 │  │                         │  │
//! │  │  Core(..)       │  │ RemoteUnavail.  │  │  NotApproved            │  │
//! │  │  (validation,   │  │ NotFound        │  │                         │  │
//! │  │   stock, status)│  │                 │  │                         │  │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘  │
//! │                                                                         │
//! │  Financial writes are never retried: every variant ends at the          │
//! │  workflow boundary and becomes a user-facing message.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use comptoir_core::{CoreError, ValidationError};
use comptoir_db::DbError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A business rule refused the operation (validation, stock, status).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The store could not be reached or failed the operation.
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// A targeted record no longer exists.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The signed-in user is waiting for approval.
    #[error("Account {0} is awaiting approval")]
    NotApproved(String),

    /// The subscription task is gone.
    #[error("Subscription closed")]
    SubscriptionClosed,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::Core(CoreError::Validation(err))
    }
}

/// ```text
/// DbError::NotFound   → SyncError::NotFound
/// anything else       → SyncError::RemoteUnavailable
/// ```
impl From<DbError> for SyncError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SyncError::NotFound { entity, id },
            other => SyncError::RemoteUnavailable(other.to_string()),
        }
    }
}

impl SyncError {
    /// True for store failures, where reads fall back to the last snapshot.
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, SyncError::RemoteUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_translate() {
        let missing: SyncError = DbError::not_found("Product", "p1").into();
        assert!(matches!(missing, SyncError::NotFound { .. }));

        let down: SyncError = DbError::ConnectionFailed("Pool is closed".into()).into();
        assert!(down.is_remote_unavailable());
    }

    #[test]
    fn test_validation_is_wrapped_in_core() {
        let err: SyncError = ValidationError::EmptyCart.into();
        assert!(matches!(
            err,
            SyncError::Core(CoreError::Validation(ValidationError::EmptyCart))
        ));
        assert_eq!(err.to_string(), "Validation error: Cart is empty");
    }
}
