//! # Product Repository
//!
//! Database operations for the catalog and the per-product stock ledger.
//!
//! ## Stock Ledger Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Atomic Check-and-Decrement                              │
//! │                                                                         │
//! │  ❌ WRONG: read stock, compare, then write (TOCTOU race)               │
//! │     SELECT stock FROM products WHERE id = ?                            │
//! │     UPDATE products SET stock = 7 WHERE id = ?                         │
//! │                                                                         │
//! │  ✅ CORRECT: single conditional UPDATE                                 │
//! │     UPDATE products SET stock = stock - ?2                             │
//! │     WHERE id = ?1 AND stock >= ?2                                      │
//! │                                                                         │
//! │  Two concurrent reservations against the same product can never        │
//! │  both observe stock sufficient for an order that together would        │
//! │  overdraw it: SQLite serializes the writes, and the WHERE clause       │
//! │  re-checks under that serialization. rows_affected == 0 means the     │
//! │  reservation lost.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use orderflow_core::Product;

/// Repository for catalog and stock operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// // Catalog lookup
/// let product = repo.get_by_id("uuid-here").await?;
///
/// // Stock ledger
/// let ok = repo.reserve_stock("uuid-here", 2).await?;
/// repo.release_stock("uuid-here", 2).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, discount_bps, stock,
                   created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products sorted by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, discount_bps, stock,
                   created_at, updated_at
            FROM products
            ORDER BY name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Arguments
    /// * `product` - Product to insert (id should be generated beforehand)
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_cents, discount_bps, stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.discount_bps)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing product's catalog fields.
    ///
    /// ## Note
    /// Stock is deliberately NOT written here - the ledger operations below
    /// are the only writers, so a stale catalog edit can never clobber a
    /// concurrent reservation.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                discount_bps = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.discount_bps)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Deletes a product.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Atomically reserves stock for one product.
    ///
    /// Check-and-decrement as a single statement; see the module docs for
    /// why this is the only safe shape under concurrency.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock was sufficient and has been decremented
    /// * `Ok(false)` - stock was insufficient (or the product is gone);
    ///   nothing changed
    pub async fn reserve_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        debug!(id = %id, quantity = %quantity, "Reserving stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2,
                updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Releases previously reserved stock for one product.
    ///
    /// Safe to call during crash recovery even if nothing was reserved,
    /// but callers must not double-release.
    pub async fn release_stock(&self, id: &str, quantity: i64) -> DbResult<()> {
        debug!(id = %id, quantity = %quantity, "Releasing stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn product(id: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            description: "test product".to_string(),
            price_cents,
            discount_bps: 0,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.products();

        repo.insert(&product("p1", 1000, 5)).await.unwrap();

        let loaded = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(loaded.price_cents, 1000);
        assert_eq!(loaded.stock, 5);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reserve_stock_decrements() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product("p1", 1000, 5)).await.unwrap();

        assert!(repo.reserve_stock("p1", 3).await.unwrap());
        assert_eq!(repo.get_by_id("p1").await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_stock_refuses_overdraw() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product("p1", 1000, 2)).await.unwrap();

        // Requesting more than available changes nothing
        assert!(!repo.reserve_stock("p1", 3).await.unwrap());
        assert_eq!(repo.get_by_id("p1").await.unwrap().unwrap().stock, 2);

        // Draining to exactly zero is allowed, then everything is refused
        assert!(repo.reserve_stock("p1", 2).await.unwrap());
        assert!(!repo.reserve_stock("p1", 1).await.unwrap());
        assert_eq!(repo.get_by_id("p1").await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_release_stock_restores() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product("p1", 1000, 5)).await.unwrap();

        assert!(repo.reserve_stock("p1", 4).await.unwrap());
        repo.release_stock("p1", 4).await.unwrap();
        assert_eq!(repo.get_by_id("p1").await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_reserve_missing_product_is_false() {
        let db = test_db().await;
        assert!(!db.products().reserve_stock("ghost", 1).await.unwrap());
    }
}
