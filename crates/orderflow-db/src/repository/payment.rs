//! # Payment Repository
//!
//! Database operations for payment records.
//!
//! ## One Payment Per Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Race-Proof Uniqueness                                      │
//! │                                                                         │
//! │  Two concurrent initiate() calls for the same order:                   │
//! │                                                                         │
//! │  Request A: INSERT INTO payments (order_id = X, ...)  → ok             │
//! │  Request B: INSERT INTO payments (order_id = X, ...)  → UNIQUE fails   │
//! │                                                                         │
//! │  The UNIQUE index on payments.order_id is the arbiter - not            │
//! │  application logic, which could never close the read/insert gap.       │
//! │  The engine maps that violation to AlreadyPaidOrPending.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use orderflow_core::{Payment, PaymentStatus};

const PAYMENT_COLUMNS: &str = r#"
    id, user_id, order_id, amount_cents, method, status,
    transaction_id, refund_reason, created_at, updated_at
"#;

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Inserts a payment record.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` on `payments.order_id` - a payment for
    ///   this order already exists (possibly created a moment ago by a
    ///   concurrent request)
    pub async fn insert(&self, payment: &Payment) -> DbResult<()> {
        debug!(id = %payment.id, order_id = %payment.order_id, amount = %payment.amount_cents, "Inserting payment");

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, order_id, amount_cents, method, status,
                transaction_id, refund_reason, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.user_id)
        .bind(&payment.order_id)
        .bind(payment.amount_cents)
        .bind(payment.method)
        .bind(payment.status)
        .bind(&payment.transaction_id)
        .bind(&payment.refund_reason)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets the payment for an order.
    pub async fn get_by_order(&self, order_id: &str) -> DbResult<Option<Payment>> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?1");
        let payment = sqlx::query_as::<_, Payment>(&query)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    /// Gets a payment by its gateway transaction id.
    pub async fn get_by_transaction(&self, transaction_id: &str) -> DbResult<Option<Payment>> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = ?1");
        let payment = sqlx::query_as::<_, Payment>(&query)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    /// Updates a payment's status.
    pub async fn set_status(&self, payment_id: &str, status: PaymentStatus) -> DbResult<()> {
        debug!(payment_id = %payment_id, ?status, "Updating payment status");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE payments SET status = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(payment_id)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", payment_id));
        }

        Ok(())
    }

    /// Marks a payment refunded, storing the mandatory reason.
    pub async fn mark_refunded(&self, payment_id: &str, reason: &str) -> DbResult<()> {
        debug!(payment_id = %payment_id, "Marking payment refunded");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'refunded',
                refund_reason = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(payment_id)
        .bind(reason)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", payment_id));
        }

        Ok(())
    }
}

/// Generates a new payment ID.
pub fn generate_payment_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use orderflow_core::{
        Order, OrderLine, OrderPaymentStatus, OrderStatus, PaymentMethod, ShippingAddress,
        StatusEntry,
    };

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn place_order(db: &Database, user_id: &str) -> Order {
        let now = Utc::now();
        let cart = db.carts().get_or_create(user_id).await.unwrap();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            lines: vec![OrderLine {
                product_id: "p1".to_string(),
                quantity: 1,
                price_at_order_cents: 2400,
            }],
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
        };
        db.orders().insert_placed(&order, &cart.id).await.unwrap();
        order
    }

    fn test_payment(user_id: &str, order_id: &str, transaction_id: &str) -> Payment {
        let now = Utc::now();
        Payment {
            id: generate_payment_id(),
            user_id: user_id.to_string(),
            order_id: order_id.to_string(),
            amount_cents: 2400,
            method: PaymentMethod::CreditCard,
            status: PaymentStatus::Pending,
            transaction_id: Some(transaction_id.to_string()),
            refund_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        let order = place_order(&db, "u1").await;
        let repo = db.payments();

        let payment = test_payment("u1", &order.id, "pi_123");
        repo.insert(&payment).await.unwrap();

        let by_order = repo.get_by_order(&order.id).await.unwrap().unwrap();
        assert_eq!(by_order.id, payment.id);

        let by_tx = repo.get_by_transaction("pi_123").await.unwrap().unwrap();
        assert_eq!(by_tx.id, payment.id);

        assert!(repo.get_by_transaction("pi_other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_payment_for_order_is_unique_violation() {
        let db = test_db().await;
        let order = place_order(&db, "u1").await;
        let repo = db.payments();

        repo.insert(&test_payment("u1", &order.id, "pi_1")).await.unwrap();
        let err = repo
            .insert(&test_payment("u1", &order.id, "pi_2"))
            .await
            .unwrap_err();

        assert!(err.is_unique_violation_on("order_id"));
    }

    #[tokio::test]
    async fn test_set_status_and_mark_refunded() {
        let db = test_db().await;
        let order = place_order(&db, "u1").await;
        let repo = db.payments();

        let payment = test_payment("u1", &order.id, "pi_1");
        repo.insert(&payment).await.unwrap();

        repo.set_status(&payment.id, PaymentStatus::Completed).await.unwrap();
        let loaded = repo.get_by_order(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PaymentStatus::Completed);

        repo.mark_refunded(&payment.id, "damaged item").await.unwrap();
        let loaded = repo.get_by_order(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PaymentStatus::Refunded);
        assert_eq!(loaded.refund_reason.as_deref(), Some("damaged item"));
    }
}
