//! # Order Repository
//!
//! Database operations for orders, order lines and the status history log.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. PLACE (one transaction)                                            │
//! │     └── insert_placed() → orders + order_lines + initial history       │
//! │         entry + the source cart deleted, atomically                    │
//! │                                                                         │
//! │  2. TRANSITION                                                         │
//! │     └── record_transition() → status UPDATE guarded by the previous    │
//! │         status + history INSERT, atomically; a lost race changes       │
//! │         nothing and reports back                                       │
//! │                                                                         │
//! │  3. RECONCILE                                                          │
//! │     └── set_payment_status() → payment_status column only              │
//! │                                                                         │
//! │  Lines and the frozen total are INSERT-only: nothing here ever         │
//! │  updates them after placement.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use orderflow_core::{
    Order, OrderLine, OrderPaymentStatus, OrderStatus, PaymentMethod, ShippingAddress, StatusEntry,
};

/// Flat orders-table row; lines and history are loaded separately.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    total_cents: i64,
    ship_name: String,
    ship_street: String,
    ship_city: String,
    ship_state: String,
    ship_zip: String,
    ship_country: String,
    payment_method: PaymentMethod,
    payment_status: OrderPaymentStatus,
    status: OrderStatus,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str = r#"
    id, user_id, total_cents,
    ship_name, ship_street, ship_city, ship_state, ship_zip, ship_country,
    payment_method, payment_status, status, tracking_number,
    created_at, updated_at
"#;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a freshly placed order and deletes its source cart,
    /// all in one transaction.
    ///
    /// ## Why One Transaction
    /// The fulfillment workflow has already reserved stock when this runs.
    /// Bundling the order row, its frozen lines, the initial history entry
    /// and the cart deletion means a failure anywhere leaves no partial
    /// state - the caller releases the reservation and the world looks as
    /// if the attempt never happened.
    pub async fn insert_placed(&self, order: &Order, cart_id: &str) -> DbResult<()> {
        debug!(order_id = %order.id, cart_id = %cart_id, total = %order.total_cents, "Persisting placed order");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, total_cents,
                ship_name, ship_street, ship_city, ship_state, ship_zip, ship_country,
                payment_method, payment_status, status, tracking_number,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13,
                ?14, ?15
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.total_cents)
        .bind(&order.shipping_address.name)
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.state)
        .bind(&order.shipping_address.zip)
        .bind(&order.shipping_address.country)
        .bind(order.payment_method)
        .bind(order.payment_status)
        .bind(order.status)
        .bind(&order.tracking_number)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, position, product_id, quantity, price_at_order_cents)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&order.id)
            .bind(position as i64)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(line.price_at_order_cents)
            .execute(&mut *tx)
            .await?;
        }

        for entry in &order.status_history {
            sqlx::query(
                "INSERT INTO order_status_history (order_id, status, changed_at) VALUES (?1, ?2, ?3)",
            )
            .bind(&order.id)
            .bind(entry.status)
            .bind(entry.changed_at)
            .execute(&mut *tx)
            .await?;
        }

        // The cart is consumed the instant the order exists
        sqlx::query("DELETE FROM carts WHERE id = ?1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Gets an order by ID, with its lines and full status history.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    /// Lists a user's orders, newest first.
    pub async fn list_by_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let query =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.assemble(row).await?);
        }
        Ok(orders)
    }

    /// Lists every order, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Order>> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.assemble(row).await?);
        }
        Ok(orders)
    }

    /// Applies a status transition guarded by the expected previous status,
    /// appending the history entry in the same transaction.
    ///
    /// ## Arguments
    /// * `from` - the status the caller validated the transition against
    /// * `to` - the new status
    /// * `tracking_number` - assigned on first entry to Shipped; COALESCE
    ///   keeps an existing number from ever being reassigned
    ///
    /// ## Returns
    /// * `Ok(true)` - transition applied and history appended
    /// * `Ok(false)` - the order's status was no longer `from` (lost a
    ///   concurrent race); nothing changed, caller should re-read
    pub async fn record_transition(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        tracking_number: Option<&str>,
    ) -> DbResult<bool> {
        debug!(order_id = %order_id, ?from, ?to, "Recording status transition");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?3,
                tracking_number = COALESCE(tracking_number, ?4),
                updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(order_id)
        .bind(from)
        .bind(to)
        .bind(tracking_number)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO order_status_history (order_id, status, changed_at) VALUES (?1, ?2, ?3)",
        )
        .bind(order_id)
        .bind(to)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }

    /// Updates the order's mirrored payment status.
    pub async fn set_payment_status(
        &self,
        order_id: &str,
        payment_status: OrderPaymentStatus,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE orders SET payment_status = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(order_id)
        .bind(payment_status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }

    /// Deletes an order and (via cascade) its lines and history, but only
    /// while it is still pending.
    ///
    /// The status guard makes delete-vs-transition races safe: whichever
    /// statement runs second sees the other's status and does nothing, so
    /// the caller's follow-up stock release can never happen twice.
    ///
    /// ## Returns
    /// * `Ok(true)` - the pending order was deleted
    /// * `Ok(false)` - no pending order with this id (absent, or already
    ///   transitioned); nothing changed
    pub async fn delete_pending(&self, order_id: &str) -> DbResult<bool> {
        debug!(order_id = %order_id, "Deleting pending order");

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1 AND status = 'pending'")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Loads lines + history for a row and assembles the domain Order.
    async fn assemble(&self, row: OrderRow) -> DbResult<Order> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT product_id, quantity, price_at_order_cents
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let status_history = sqlx::query_as::<_, StatusEntry>(
            r#"
            SELECT status, changed_at
            FROM order_status_history
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            lines,
            total_cents: row.total_cents,
            shipping_address: ShippingAddress {
                name: row.ship_name,
                street: row.ship_street,
                city: row.ship_city,
                state: row.ship_state,
                zip: row.ship_zip,
                country: row.ship_country,
            },
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            status: row.status,
            status_history,
            tracking_number: row.tracking_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn test_order(user_id: &str) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            lines: vec![
                OrderLine {
                    product_id: "p1".to_string(),
                    quantity: 2,
                    price_at_order_cents: 1000,
                },
                OrderLine {
                    product_id: "p2".to_string(),
                    quantity: 1,
                    price_at_order_cents: 400,
                },
            ],
            total_cents: 2400,
            shipping_address: ShippingAddress {
                name: "Jane Doe".to_string(),
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip: "62704".to_string(),
                country: "USA".to_string(),
            },
            payment_method: PaymentMethod::CreditCard,
            payment_status: OrderPaymentStatus::NotCharged,
            status: OrderStatus::Pending,
            status_history: vec![StatusEntry {
                status: OrderStatus::Pending,
                changed_at: now,
            }],
            tracking_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn place(db: &Database, user_id: &str) -> Order {
        let cart = db.carts().get_or_create(user_id).await.unwrap();
        let order = test_order(user_id);
        db.orders().insert_placed(&order, &cart.id).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_insert_placed_roundtrip_and_cart_gone() {
        let db = test_db().await;
        let order = place(&db, "u1").await;

        let loaded = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.total_cents, 2400);
        assert_eq!(loaded.lines.len(), 2);
        assert_eq!(loaded.lines[0].product_id, "p1");
        assert_eq!(loaded.lines[1].price_at_order_cents, 400);
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.status_history.len(), 1);
        assert_eq!(loaded.shipping_address.city, "Springfield");

        // The source cart was consumed in the same transaction
        assert!(db.carts().get_by_user("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_transition_appends_history() {
        let db = test_db().await;
        let order = place(&db, "u1").await;

        let applied = db
            .orders()
            .record_transition(&order.id, OrderStatus::Pending, OrderStatus::Processing, None)
            .await
            .unwrap();
        assert!(applied);

        let loaded = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Processing);
        assert_eq!(loaded.status_history.len(), 2);
        assert_eq!(loaded.status_history[1].status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_record_transition_guard_rejects_stale_from() {
        let db = test_db().await;
        let order = place(&db, "u1").await;

        // Order is Pending; a transition claiming it is Processing loses
        let applied = db
            .orders()
            .record_transition(&order.id, OrderStatus::Processing, OrderStatus::Shipped, None)
            .await
            .unwrap();
        assert!(!applied);

        let loaded = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.status_history.len(), 1);
    }

    #[tokio::test]
    async fn test_tracking_number_is_never_reassigned() {
        let db = test_db().await;
        let order = place(&db, "u1").await;
        let orders = db.orders();

        orders
            .record_transition(&order.id, OrderStatus::Pending, OrderStatus::Processing, None)
            .await
            .unwrap();
        orders
            .record_transition(
                &order.id,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                Some("TRK-1"),
            )
            .await
            .unwrap();

        // A later transition passing a different number must not overwrite
        orders
            .record_transition(
                &order.id,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
                Some("TRK-2"),
            )
            .await
            .unwrap();

        let loaded = orders.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.tracking_number.as_deref(), Some("TRK-1"));
    }

    #[tokio::test]
    async fn test_list_by_user_newest_first() {
        let db = test_db().await;
        let o1 = place(&db, "u1").await;
        let _other = place(&db, "u2").await;
        let o2 = place(&db, "u1").await;

        let orders = db.orders().list_by_user("u1").await.unwrap();
        assert_eq!(orders.len(), 2);
        let ids: Vec<_> = orders.iter().map(|o| o.id.as_str()).collect();
        assert!(ids.contains(&o1.id.as_str()));
        assert!(ids.contains(&o2.id.as_str()));
    }

    #[tokio::test]
    async fn test_set_payment_status() {
        let db = test_db().await;
        let order = place(&db, "u1").await;

        db.orders()
            .set_payment_status(&order.id, OrderPaymentStatus::Charged)
            .await
            .unwrap();

        let loaded = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.payment_status, OrderPaymentStatus::Charged);
    }
}
