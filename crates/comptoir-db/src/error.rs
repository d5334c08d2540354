//! # Store Errors
//!
//! ```text
//!   sqlx::Error ──┐
//!   MigrateError ─┼──► DbError ──► SyncError (NotFound kept, the rest is
//!   serde_json ───┘                "remote unavailable") ──► ApiError
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row for this owner and id. Batches raise it when an update or
    /// delete matches nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A second document with the same reference for one owner.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// The file could not be opened, or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A batch could not begin or commit; nothing was written.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A JSON column (items, customer snapshot, settings) is malformed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// The store refused or could not be reached, as opposed to a missing
    /// row or bad input.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_)
                | DbError::PoolExhausted
                | DbError::TransactionFailed(_)
                | DbError::QueryFailed(_)
        )
    }
}

/// ```text
/// RowNotFound               → NotFound
/// "UNIQUE constraint failed" → UniqueViolation (field = table.column)
/// PoolTimedOut              → PoolExhausted
/// PoolClosed / Io           → ConnectionFailed
/// anything else             → QueryFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                match msg.strip_prefix("UNIQUE constraint failed: ") {
                    Some(field) => DbError::duplicate(field, "unknown"),
                    None => DbError::QueryFailed(msg.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_not_unavailable() {
        let err = DbError::not_found("Product", "p1");
        assert!(!err.is_unavailable());
        assert_eq!(err.to_string(), "Product not found: p1");
    }

    #[test]
    fn test_pool_closed_is_unavailable() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_bad_json_column() {
        let err: DbError = serde_json::from_str::<Vec<String>>("{").unwrap_err().into();
        assert!(matches!(err, DbError::Serialization(_)));
        assert!(!err.is_unavailable());
    }
}
