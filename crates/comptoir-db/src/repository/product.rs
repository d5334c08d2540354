//! # Product Repository
//!
//! Owner-scoped reads of the product collection, plus the write statements
//! that [`crate::batch`] runs inside a commit transaction.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ Absolute update (loses a concurrent sale)                       │
//! │     UPDATE products SET stock = 7 WHERE id = ?                      │
//! │                                                                     │
//! │  ✅ Delta update                                                    │
//! │     UPDATE products SET stock = COALESCE(stock, 0) + ? WHERE id = ? │
//! │                                                                     │
//! │  Window A issues 3 → stock - 3                                      │
//! │  Window B issues 2 → stock - 2                                      │
//! │  Both land: -3 + -2 = -5 total                                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use comptoir_core::{Money, Product};

const SELECT_PRODUCT: &str = r#"
    SELECT id, reference, name, description,
           purchase_price_centimes, sale_price_centimes, stock
    FROM products
"#;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    reference: String,
    name: String,
    description: String,
    purchase_price_centimes: i64,
    sale_price_centimes: i64,
    stock: i64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            reference: row.reference,
            name: row.name,
            description: row.description,
            purchase_price: Money::from_centimes(row.purchase_price_centimes),
            sale_price: Money::from_centimes(row.sale_price_centimes),
            stock: row.stock,
        }
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// All products of an owner, sorted by name.
    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE owner_id = ?1 ORDER BY name COLLATE NOCASE, id");

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id, count = rows.len(), "Listed products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by its ID.
    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE owner_id = ?1 AND id = ?2");

        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Current rows for the given ids, read straight from the table.
    ///
    /// This is the authoritative read used by the stock check before an
    /// issuance; ids that no longer exist are simply absent from the result.
    pub async fn get_many(&self, owner_id: &str, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_PRODUCT);
        builder.push(" WHERE owner_id = ").push_bind(owner_id);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows: Vec<ProductRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id, requested = ids.len(), found = rows.len(), "Fetched products by id");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Counts an owner's products.
    pub async fn count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Batch statements
    // =========================================================================

    /// Inserts or replaces a product. Fails with NotFound when the id
    /// belongs to another owner.
    pub(crate) async fn upsert_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        product: &Product,
    ) -> DbResult<()> {
        debug!(id = %product.id, reference = %product.reference, "Upserting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                id, owner_id, reference, name, description,
                purchase_price_centimes, sale_price_centimes, stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ON CONFLICT(id) DO UPDATE SET
                reference = excluded.reference,
                name = excluded.name,
                description = excluded.description,
                purchase_price_centimes = excluded.purchase_price_centimes,
                sale_price_centimes = excluded.sale_price_centimes,
                stock = excluded.stock,
                updated_at = excluded.updated_at
            WHERE products.owner_id = excluded.owner_id
            "#,
        )
        .bind(&product.id)
        .bind(owner_id)
        .bind(&product.reference)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.purchase_price.centimes())
        .bind(product.sale_price.centimes())
        .bind(product.stock)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Adds `delta` to a product's stock (negative for issuance).
    pub(crate) async fn adjust_stock_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        id: &str,
        delta: i64,
    ) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Updating stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = COALESCE(stock, 0) + ?3,
                updated_at = ?4
            WHERE owner_id = ?1 AND id = ?2
            "#,
        )
        .bind(owner_id)
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    pub(crate) async fn delete_in(conn: &mut SqliteConnection, owner_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE owner_id = ?1 AND id = ?2")
            .bind(owner_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Deletes every product of an owner. Returns the number removed.
    pub(crate) async fn delete_all_in(conn: &mut SqliteConnection, owner_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM products WHERE owner_id = ?1")
            .bind(owner_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::batch::{WriteBatch, WriteOp};
    use crate::{Database, DbConfig};
    use comptoir_core::{Money, Product};

    fn product(id: &str, name: &str, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            reference: format!("PRD-{id}"),
            name: name.to_string(),
            description: String::new(),
            purchase_price: Money::from_centimes(500),
            sale_price: Money::from_centimes(1_000),
            stock,
        }
    }

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertProduct(product("p1", "Vis", 4)));
        batch.push(WriteOp::UpsertProduct(product("p2", "ampoule", 0)));
        db.commit("owner-a", &batch).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name_and_scoped() {
        let db = seeded().await;

        let names: Vec<String> = db
            .products()
            .list("owner-a")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["ampoule", "Vis"]);

        assert!(db.products().list("owner-b").await.unwrap().is_empty());
        assert_eq!(db.products().count("owner-a").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_many_skips_missing_ids() {
        let db = seeded().await;

        let found = db
            .products()
            .get_many("owner-a", &["p1".to_string(), "gone".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].stock, 4);

        assert!(db.products().get_many("owner-a", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_cannot_take_over_another_owners_row() {
        let db = seeded().await;

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertProduct(product("p1", "Hijack", 99)));
        assert!(db.commit("owner-b", &batch).await.is_err());

        let kept = db.products().get("owner-a", "p1").await.unwrap().unwrap();
        assert_eq!(kept.name, "Vis");
    }
}
