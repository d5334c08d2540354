//! # Sales Document Repository
//!
//! Quotes, delivery notes and invoices.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  documents                                                              │
//! │  ├── doc_type, reference, issued_at, status, quote_ref   (columns)      │
//! │  ├── total_ht/tva/ttc_centimes                            (columns)     │
//! │  ├── customer_json   ← CustomerSnapshot, frozen at issuance             │
//! │  └── items_json      ← Vec<DocumentItem>, frozen at issuance            │
//! │                                                                         │
//! │  Only `status` is ever updated after insert.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use comptoir_core::{DocumentStatus, DocumentType, Money, SalesDocument};

const SELECT_DOCUMENT: &str = r#"
    SELECT id, doc_type, reference, issued_at, customer_json, items_json,
           total_ht_centimes, total_tva_centimes, total_ttc_centimes,
           status, quote_ref
    FROM documents
"#;

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    doc_type: DocumentType,
    reference: String,
    issued_at: DateTime<Utc>,
    customer_json: String,
    items_json: String,
    total_ht_centimes: i64,
    total_tva_centimes: i64,
    total_ttc_centimes: i64,
    status: DocumentStatus,
    quote_ref: Option<String>,
}

impl TryFrom<DocumentRow> for SalesDocument {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(SalesDocument {
            id: row.id,
            doc_type: row.doc_type,
            reference: row.reference,
            date: row.issued_at,
            customer: serde_json::from_str(&row.customer_json)?,
            items: serde_json::from_str(&row.items_json)?,
            total_ht: Money::from_centimes(row.total_ht_centimes),
            total_tva: Money::from_centimes(row.total_tva_centimes),
            total_ttc: Money::from_centimes(row.total_ttc_centimes),
            status: row.status,
            quote_ref: row.quote_ref,
        })
    }
}

fn into_documents(rows: Vec<DocumentRow>) -> DbResult<Vec<SalesDocument>> {
    rows.into_iter().map(SalesDocument::try_from).collect()
}

/// Repository for sales document operations.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// All documents of an owner, newest first.
    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<SalesDocument>> {
        let sql = format!("{SELECT_DOCUMENT} WHERE owner_id = ?1 ORDER BY issued_at DESC, reference DESC");

        let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id, count = rows.len(), "Listed documents");
        into_documents(rows)
    }

    /// Documents of one type, newest first.
    pub async fn list_by_type(&self, owner_id: &str, doc_type: DocumentType) -> DbResult<Vec<SalesDocument>> {
        let sql = format!(
            "{SELECT_DOCUMENT} WHERE owner_id = ?1 AND doc_type = ?2 ORDER BY issued_at DESC, reference DESC"
        );

        let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .bind(doc_type)
            .fetch_all(&self.pool)
            .await?;

        into_documents(rows)
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<SalesDocument>> {
        let sql = format!("{SELECT_DOCUMENT} WHERE owner_id = ?1 AND id = ?2");

        let row: Option<DocumentRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SalesDocument::try_from).transpose()
    }

    pub async fn count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Batch statements
    // =========================================================================

    pub(crate) async fn insert_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        document: &SalesDocument,
    ) -> DbResult<()> {
        debug!(reference = %document.reference, doc_type = %document.doc_type, "Inserting document");

        let customer_json = serde_json::to_string(&document.customer)?;
        let items_json = serde_json::to_string(&document.items)?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, owner_id, doc_type, reference, issued_at,
                customer_json, items_json,
                total_ht_centimes, total_tva_centimes, total_ttc_centimes,
                status, quote_ref, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            "#,
        )
        .bind(&document.id)
        .bind(owner_id)
        .bind(document.doc_type)
        .bind(&document.reference)
        .bind(document.date)
        .bind(customer_json)
        .bind(items_json)
        .bind(document.total_ht.centimes())
        .bind(document.total_tva.centimes())
        .bind(document.total_ttc.centimes())
        .bind(document.status)
        .bind(&document.quote_ref)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &document.reference),
            other => other,
        })?;

        Ok(())
    }

    pub(crate) async fn update_status_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        id: &str,
        status: DocumentStatus,
    ) -> DbResult<()> {
        debug!(id = %id, status = %status, "Updating document status");

        let result = sqlx::query(
            "UPDATE documents SET status = ?3, updated_at = ?4 WHERE owner_id = ?1 AND id = ?2",
        )
        .bind(owner_id)
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Document", id));
        }

        Ok(())
    }

    pub(crate) async fn delete_in(conn: &mut SqliteConnection, owner_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE owner_id = ?1 AND id = ?2")
            .bind(owner_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Document", id));
        }

        Ok(())
    }
}
