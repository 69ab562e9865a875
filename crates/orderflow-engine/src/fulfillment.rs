//! # Fulfillment Workflow
//!
//! Cart → Order conversion and the order status state machine.
//!
//! ## Placement Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    place_order()                                        │
//! │                                                                         │
//! │  1. validate shipping address                                          │
//! │  2. load cart ──────────────────────► EmptyCart if no lines            │
//! │  3. snapshot prices, compute totals   (pure, orderflow-core::pricing)  │
//! │  4. reserve stock, all-or-nothing ──► InsufficientStock aborts here;   │
//! │     │                                 cart and catalog untouched       │
//! │  5. persist order + initial history                                    │
//! │     + delete cart (ONE transaction)                                    │
//! │     │                                                                   │
//! │     └── on failure: release every unit step 4 reserved, then surface   │
//! │                                                                         │
//! │  No stock is ever lost to a failed order write - that rollback is      │
//! │  the central correctness property of this workflow.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::stock::StockLedger;
use orderflow_core::{
    pricing, validation, CoreError, Identity, Order, OrderPaymentStatus, OrderStatus,
    PaymentMethod, Product, ShippingAddress, StatusEntry,
};
use orderflow_db::Database;

/// Fulfillment workflow operations.
#[derive(Debug, Clone)]
pub struct FulfillmentService {
    db: Database,
    ledger: StockLedger,
}

impl FulfillmentService {
    /// Creates a new FulfillmentService.
    pub fn new(db: Database) -> Self {
        let ledger = StockLedger::new(db.clone());
        FulfillmentService { db, ledger }
    }

    /// Converts the caller's cart into a pending order.
    ///
    /// See the module docs for the placement sequence and its rollback
    /// guarantees.
    pub async fn place_order(
        &self,
        identity: &Identity,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> EngineResult<Order> {
        validation::validate_shipping_address(&shipping_address)?;

        let carts = self.db.carts();
        let products = self.db.products();

        let cart = carts
            .get_by_user(&identity.user_id)
            .await?
            .filter(|c| !c.is_empty())
            .ok_or(EngineError::EmptyCart)?;

        // Join lines against the live catalog and freeze prices
        let mut joined: Vec<(Product, i64)> = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let product = products
                .get_by_id(&line.product_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Product", &line.product_id))?;
            joined.push((product, line.quantity));
        }

        let lines: Vec<_> = joined
            .iter()
            .map(|(product, qty)| pricing::snapshot_line(product, *qty))
            .collect();
        let total = pricing::order_total(&lines);

        // Reserve stock; a failure here aborts with nothing to undo
        let reservation: Vec<(String, i64)> = lines
            .iter()
            .map(|l| (l.product_id.clone(), l.quantity))
            .collect();
        self.ledger.reserve_batch(&reservation).await?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: identity.user_id.clone(),
            lines,
            total_cents: total.cents(),
            shipping_address,
            payment_method,
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

        // Persist order + consume cart atomically; roll the reservation
        // back if that transaction fails for any reason
        if let Err(err) = self.db.orders().insert_placed(&order, &cart.id).await {
            warn!(order_id = %order.id, error = %err, "Order persist failed, releasing reservation");
            if let Err(release_err) = self.ledger.release_batch(&reservation).await {
                warn!(order_id = %order.id, error = %release_err, "Reservation rollback failed");
            }
            return Err(err.into());
        }

        info!(
            order_id = %order.id,
            user_id = %identity.user_id,
            total = %total,
            lines = order.lines.len(),
            "Order placed"
        );

        Ok(order)
    }

    /// Gets one order, scoped to its owner.
    ///
    /// An order that exists but belongs to someone else reads as NotFound
    /// (admins see everything).
    pub async fn get_order(&self, identity: &Identity, order_id: &str) -> EngineResult<Order> {
        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order", order_id))?;

        if order.user_id != identity.user_id && !identity.is_admin() {
            return Err(EngineError::not_found("Order", order_id));
        }

        Ok(order)
    }

    /// Lists the caller's orders, newest first.
    pub async fn list_orders(&self, identity: &Identity) -> EngineResult<Vec<Order>> {
        Ok(self.db.orders().list_by_user(&identity.user_id).await?)
    }

    /// Lists every order (admin only).
    pub async fn list_all_orders(&self, identity: &Identity) -> EngineResult<Vec<Order>> {
        if !identity.is_admin() {
            return Err(EngineError::Forbidden);
        }
        Ok(self.db.orders().list_all().await?)
    }

    /// Applies a status transition (admin only).
    ///
    /// Entering Shipped for the first time assigns a tracking number;
    /// entering Cancelled releases the order's reserved stock.
    pub async fn update_status(
        &self,
        identity: &Identity,
        order_id: &str,
        new_status: OrderStatus,
    ) -> EngineResult<Order> {
        if !identity.is_admin() {
            return Err(EngineError::Forbidden);
        }

        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order", order_id))?;

        self.apply_transition(order, new_status).await
    }

    /// Cancels an order (owner or admin).
    ///
    /// Only valid from Pending or Processing, per the transition table.
    /// Stock reserved at placement is released.
    pub async fn cancel_order(&self, identity: &Identity, order_id: &str) -> EngineResult<Order> {
        let order = self.get_order(identity, order_id).await?;
        self.apply_transition(order, OrderStatus::Cancelled).await
    }

    /// Deletes a pending order (admin only), releasing its reserved stock.
    pub async fn delete_order(&self, identity: &Identity, order_id: &str) -> EngineResult<()> {
        if !identity.is_admin() {
            return Err(EngineError::Forbidden);
        }

        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order", order_id))?;

        // The status-guarded delete arbitrates against concurrent
        // transitions; only the actual deleter releases stock
        if !self.db.orders().delete_pending(order_id).await? {
            return Err(EngineError::NotDeletable {
                order_id: order_id.to_string(),
                status: order.status,
            });
        }

        let reservation: Vec<(String, i64)> = order
            .lines
            .iter()
            .map(|l| (l.product_id.clone(), l.quantity))
            .collect();
        self.ledger.release_batch(&reservation).await?;

        info!(order_id = %order_id, "Pending order deleted, stock released");
        Ok(())
    }

    /// Validates and records one transition, handling tracking-number
    /// assignment and cancellation stock release.
    async fn apply_transition(&self, order: Order, to: OrderStatus) -> EngineResult<Order> {
        if !order.status.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                from: order.status,
                to,
            }
            .into());
        }

        // Fresh tracking number on first entry to Shipped only; the
        // repository's COALESCE keeps an existing one untouched
        let tracking = if to == OrderStatus::Shipped && order.tracking_number.is_none() {
            Some(generate_tracking_number())
        } else {
            None
        };

        let applied = self
            .db
            .orders()
            .record_transition(&order.id, order.status, to, tracking.as_deref())
            .await?;

        if !applied {
            // Lost a race; report against the status that actually won
            let current = self
                .db
                .orders()
                .get_by_id(&order.id)
                .await?
                .ok_or_else(|| EngineError::not_found("Order", &order.id))?;
            return Err(CoreError::InvalidTransition {
                from: current.status,
                to,
            }
            .into());
        }

        if to == OrderStatus::Cancelled {
            let reservation: Vec<(String, i64)> = order
                .lines
                .iter()
                .map(|l| (l.product_id.clone(), l.quantity))
                .collect();
            self.ledger.release_batch(&reservation).await?;
            info!(order_id = %order.id, "Order cancelled, stock released");
        }

        info!(order_id = %order.id, from = ?order.status, ?to, "Order status updated");

        self.db
            .orders()
            .get_by_id(&order.id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order", &order.id))
    }
}

/// Generates a fresh random tracking number.
fn generate_tracking_number() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("TRK-{}", id[..12].to_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartService;
    use orderflow_db::DbConfig;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed(db: &Database, id: &str, price_cents: i64, discount_bps: u32, stock: i64) {
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: id.to_string(),
                name: id.to_uppercase(),
                description: String::new(),
                price_cents,
                discount_bps,
                stock,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Jane Doe".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62704".to_string(),
            country: "USA".to_string(),
        }
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    /// Builds the §8 reference cart: (P1 $10.00 ×2) + (P2 $5.00 −20% ×1).
    async fn fill_reference_cart(db: &Database, identity: &Identity) {
        let carts = CartService::new(db.clone());
        carts.add_item(identity, "p1", 2).await.unwrap();
        carts.add_item(identity, "p2", 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_place_order_freezes_prices_and_consumes_cart() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0, 10).await;
        seed(&db, "p2", 500, 2000, 10).await;

        let identity = Identity::customer("u1");
        fill_reference_cart(&db, &identity).await;

        let service = FulfillmentService::new(db.clone());
        let order = service
            .place_order(&identity, address(), PaymentMethod::CreditCard)
            .await
            .unwrap();

        // 2 × $10.00 + 1 × $4.00 = $24.00
        assert_eq!(order.total_cents, 2400);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].price_at_order_cents, 1000);
        assert_eq!(order.lines[1].price_at_order_cents, 400);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, OrderPaymentStatus::NotCharged);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.status_history[0].status, OrderStatus::Pending);

        // Stock reserved
        assert_eq!(stock_of(&db, "p1").await, 8);
        assert_eq!(stock_of(&db, "p2").await, 9);

        // Cart deleted the instant the order exists
        assert!(db.carts().get_by_user("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_place_order_with_empty_cart() {
        let db = test_db().await;
        let service = FulfillmentService::new(db);
        let identity = Identity::customer("u1");

        let err = service
            .place_order(&identity, address(), PaymentMethod::CreditCard)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyCart));
    }

    #[tokio::test]
    async fn test_insufficient_stock_aborts_cleanly() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0, 10).await;
        seed(&db, "p2", 500, 2000, 0).await; // P2 out of stock

        let identity = Identity::customer("u1");
        fill_reference_cart(&db, &identity).await;

        let service = FulfillmentService::new(db.clone());
        let err = service
            .place_order(&identity, address(), PaymentMethod::CreditCard)
            .await
            .unwrap_err();

        match err {
            EngineError::InsufficientStock { product_id, name } => {
                assert_eq!(product_id, "p2");
                assert_eq!(name, "P2");
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // No order, cart untouched, P1's tentative reservation restored
        assert!(db.orders().list_by_user("u1").await.unwrap().is_empty());
        let cart = db.carts().get_by_user("u1").await.unwrap().unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(stock_of(&db, "p1").await, 10);
    }

    #[tokio::test]
    async fn test_place_order_rejects_bad_address() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0, 10).await;

        let identity = Identity::customer("u1");
        CartService::new(db.clone())
            .add_item(&identity, "p1", 1)
            .await
            .unwrap();

        let mut bad = address();
        bad.zip = String::new();

        let service = FulfillmentService::new(db.clone());
        let err = service
            .place_order(&identity, bad, PaymentMethod::CreditCard)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));

        // Nothing was reserved for a request that failed validation
        assert_eq!(stock_of(&db, "p1").await, 10);
    }

    #[tokio::test]
    async fn test_get_order_ownership() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0, 10).await;

        let owner = Identity::customer("u1");
        CartService::new(db.clone())
            .add_item(&owner, "p1", 1)
            .await
            .unwrap();

        let service = FulfillmentService::new(db.clone());
        let order = service
            .place_order(&owner, address(), PaymentMethod::CreditCard)
            .await
            .unwrap();

        // Owner sees it
        assert!(service.get_order(&owner, &order.id).await.is_ok());

        // Another customer gets NotFound, not Forbidden
        let stranger = Identity::customer("u2");
        let err = service.get_order(&stranger, &order.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Order", .. }));

        // Admin sees everything
        let admin = Identity::admin("root");
        assert!(service.get_order(&admin, &order.id).await.is_ok());
        assert_eq!(service.list_all_orders(&admin).await.unwrap().len(), 1);
        assert!(matches!(
            service.list_all_orders(&stranger).await.unwrap_err(),
            EngineError::Forbidden
        ));
    }

    #[tokio::test]
    async fn test_status_walk_assigns_tracking_once() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0, 10).await;

        let identity = Identity::customer("u1");
        CartService::new(db.clone())
            .add_item(&identity, "p1", 1)
            .await
            .unwrap();

        let service = FulfillmentService::new(db.clone());
        let admin = Identity::admin("root");
        let order = service
            .place_order(&identity, address(), PaymentMethod::CreditCard)
            .await
            .unwrap();

        assert!(order.tracking_number.is_none());

        let order = service
            .update_status(&admin, &order.id, OrderStatus::Processing)
            .await
            .unwrap();
        assert!(order.tracking_number.is_none());

        let order = service
            .update_status(&admin, &order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        let tracking = order.tracking_number.clone().expect("tracking assigned on ship");

        let order = service
            .update_status(&admin, &order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(order.tracking_number.as_deref(), Some(tracking.as_str()));

        // History holds every status ever held, in chronological order
        let statuses: Vec<_> = order.status_history.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_transitions_rejected() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0, 10).await;

        let identity = Identity::customer("u1");
        CartService::new(db.clone())
            .add_item(&identity, "p1", 1)
            .await
            .unwrap();

        let service = FulfillmentService::new(db.clone());
        let admin = Identity::admin("root");
        let order = service
            .place_order(&identity, address(), PaymentMethod::CreditCard)
            .await
            .unwrap();

        // pending → shipped skips processing
        let err = service
            .update_status(&admin, &order.id, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));

        // Non-admin may not drive the state machine at all
        let err = service
            .update_status(&identity, &order.id, OrderStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden));
    }

    #[tokio::test]
    async fn test_cancel_releases_stock() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0, 10).await;

        let identity = Identity::customer("u1");
        CartService::new(db.clone())
            .add_item(&identity, "p1", 3)
            .await
            .unwrap();

        let service = FulfillmentService::new(db.clone());
        let order = service
            .place_order(&identity, address(), PaymentMethod::CreditCard)
            .await
            .unwrap();
        assert_eq!(stock_of(&db, "p1").await, 7);

        let order = service.cancel_order(&identity, &order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&db, "p1").await, 10);

        // Cancelling again is an invalid transition, and releases nothing
        let err = service.cancel_order(&identity, &order.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));
        assert_eq!(stock_of(&db, "p1").await, 10);
    }

    #[tokio::test]
    async fn test_delete_order_pending_only_and_releases_stock() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0, 10).await;

        let identity = Identity::customer("u1");
        let admin = Identity::admin("root");
        CartService::new(db.clone())
            .add_item(&identity, "p1", 2)
            .await
            .unwrap();

        let service = FulfillmentService::new(db.clone());
        let order = service
            .place_order(&identity, address(), PaymentMethod::CreditCard)
            .await
            .unwrap();
        assert_eq!(stock_of(&db, "p1").await, 8);

        service.delete_order(&admin, &order.id).await.unwrap();
        assert_eq!(stock_of(&db, "p1").await, 10);
        assert!(db.orders().get_by_id(&order.id).await.unwrap().is_none());

        // A processing order refuses deletion
        CartService::new(db.clone())
            .add_item(&identity, "p1", 1)
            .await
            .unwrap();
        let order = service
            .place_order(&identity, address(), PaymentMethod::CreditCard)
            .await
            .unwrap();
        service
            .update_status(&admin, &order.id, OrderStatus::Processing)
            .await
            .unwrap();

        let err = service.delete_order(&admin, &order.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotDeletable { .. }));
    }
}
