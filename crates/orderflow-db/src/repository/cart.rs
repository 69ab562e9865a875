//! # Cart Repository
//!
//! Database operations for carts and cart lines.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Lifecycle                                    │
//! │                                                                         │
//! │  1. LAZY CREATE                                                        │
//! │     └── get_or_create() on first add-to-cart                           │
//! │         (carts.user_id UNIQUE absorbs concurrent creates)              │
//! │                                                                         │
//! │  2. MUTATE                                                             │
//! │     └── upsert_line() → merge duplicates by incrementing quantity      │
//! │     └── set_line_quantity() / delete_line()                            │
//! │     └── set_total() → live total written back by the workflow          │
//! │                                                                         │
//! │  3. CONVERT                                                            │
//! │     └── deleted by OrderRepository::insert_placed() in the same        │
//! │         transaction that persists the order                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use orderflow_core::{Cart, CartLine};

/// Flat carts-table row; lines are loaded separately and assembled.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: String,
    user_id: String,
    total_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Gets a user's cart with its lines.
    ///
    /// ## Returns
    /// * `Ok(Some(Cart))` - cart exists (possibly with zero lines)
    /// * `Ok(None)` - user has no cart; a valid, non-error state
    pub async fn get_by_user(&self, user_id: &str) -> DbResult<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, total_cents, created_at, updated_at
            FROM carts
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines = self.get_lines(&row.id).await?;

        Ok(Some(Cart {
            id: row.id,
            user_id: row.user_id,
            lines,
            total_cents: row.total_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Gets a user's cart, creating an empty one if absent.
    ///
    /// Two concurrent first-adds race on the INSERT; the unique constraint
    /// on `user_id` lets one win and the other fall through to the SELECT.
    pub async fn get_or_create(&self, user_id: &str) -> DbResult<Cart> {
        if let Some(cart) = self.get_by_user(user_id).await? {
            return Ok(cart);
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(user_id = %user_id, cart_id = %id, "Creating cart");

        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, total_cents, created_at, updated_at)
            VALUES (?1, ?2, 0, ?3, ?3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_user(user_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", user_id))
    }

    /// Gets the lines of a cart in insertion order.
    pub async fn get_lines(&self, cart_id: &str) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT product_id, quantity
            FROM cart_lines
            WHERE cart_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Adds quantity to a line, creating it if absent.
    ///
    /// Duplicates merge by incrementing - one row per (cart, product).
    pub async fn upsert_line(&self, cart_id: &str, product_id: &str, quantity: i64) -> DbResult<()> {
        debug!(cart_id = %cart_id, product_id = %product_id, quantity = %quantity, "Upserting cart line");

        sqlx::query(
            r#"
            INSERT INTO cart_lines (cart_id, product_id, quantity)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = quantity + excluded.quantity
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets one line's quantity.
    pub async fn get_line_quantity(&self, cart_id: &str, product_id: &str) -> DbResult<Option<i64>> {
        let quantity: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM cart_lines WHERE cart_id = ?1 AND product_id = ?2",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quantity)
    }

    /// Overwrites one line's quantity.
    pub async fn set_line_quantity(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE cart_lines SET quantity = ?3 WHERE cart_id = ?1 AND product_id = ?2",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart line", product_id));
        }

        Ok(())
    }

    /// Removes one line entirely.
    pub async fn delete_line(&self, cart_id: &str, product_id: &str) -> DbResult<()> {
        let result =
            sqlx::query("DELETE FROM cart_lines WHERE cart_id = ?1 AND product_id = ?2")
                .bind(cart_id)
                .bind(product_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart line", product_id));
        }

        Ok(())
    }

    /// Writes the recomputed live total back to the cart row.
    ///
    /// ## When To Call
    /// After every cart mutation, with a total freshly computed from
    /// current catalog prices (orderflow-core::pricing::cart_total).
    pub async fn set_total(&self, cart_id: &str, total_cents: i64) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE carts SET total_cents = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(cart_id)
        .bind(total_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart", cart_id));
        }

        Ok(())
    }

    /// Deletes a cart and (via cascade) its lines.
    ///
    /// ## Note
    /// The fulfillment path does NOT use this - cart deletion there happens
    /// inside the order-placement transaction. This exists for explicit
    /// clear-cart operations.
    pub async fn delete(&self, cart_id: &str) -> DbResult<()> {
        debug!(cart_id = %cart_id, "Deleting cart");

        sqlx::query("DELETE FROM carts WHERE id = ?1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
