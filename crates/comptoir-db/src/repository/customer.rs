//! # Customer Repository
//!
//! Owner-scoped customer reads and the batch write statements.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use comptoir_core::Customer;

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    address: String,
    ice: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            ice: row.ice,
        }
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// All customers of an owner, sorted by name.
    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<Customer>> {
        let rows: Vec<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, phone, address, ice
            FROM customers
            WHERE owner_id = ?1
            ORDER BY name COLLATE NOCASE, id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, phone, address, ice
            FROM customers
            WHERE owner_id = ?1 AND id = ?2
            "#,
        )
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    pub async fn count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Batch statements
    // =========================================================================

    pub(crate) async fn upsert_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        customer: &Customer,
    ) -> DbResult<()> {
        debug!(id = %customer.id, "Upserting customer");

        let result = sqlx::query(
            r#"
            INSERT INTO customers (
                id, owner_id, name, email, phone, address, ice, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                address = excluded.address,
                ice = excluded.ice,
                updated_at = excluded.updated_at
            WHERE customers.owner_id = excluded.owner_id
            "#,
        )
        .bind(&customer.id)
        .bind(owner_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.ice)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
        }

        Ok(())
    }

    pub(crate) async fn delete_in(conn: &mut SqliteConnection, owner_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE owner_id = ?1 AND id = ?2")
            .bind(owner_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::batch::{WriteBatch, WriteOp};
    use crate::{Database, DbConfig, DbError};
    use comptoir_core::Customer;

    #[tokio::test]
    async fn test_upsert_then_delete_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut customer = Customer::walk_in("c1");
        customer.ice = Some("001234567000089".to_string());
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertCustomer(customer.clone()));
        db.commit("owner-a", &batch).await.unwrap();

        let stored = db.customers().get("owner-a", "c1").await.unwrap().unwrap();
        assert_eq!(stored, customer);

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::DeleteCustomer { id: "c1".to_string() });
        db.commit("owner-a", &batch).await.unwrap();
        assert_eq!(db.customers().count("owner-a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_customer_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::DeleteCustomer { id: "nobody".to_string() });
        let err = db.commit("owner-a", &batch).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
