//! # Cart Aggregate
//!
//! Cart operations: get, add item, remove item.
//!
//! ## Live Pricing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Total Recomputation                             │
//! │                                                                         │
//! │  Every mutation                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  re-read the catalog for EVERY remaining line                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pricing::cart_total() ──► carts.set_total()                           │
//! │                                                                         │
//! │  The cart always shows what the items would cost RIGHT NOW. Only      │
//! │  order placement freezes prices. This asymmetry is a business rule;   │
//! │  do not cache catalog reads here to "optimize" it away.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use orderflow_core::{pricing, validation, Cart, Identity, Product, MAX_CART_LINES};
use orderflow_db::Database;

/// Cart workflow operations.
#[derive(Debug, Clone)]
pub struct CartService {
    db: Database,
}

impl CartService {
    /// Creates a new CartService.
    pub fn new(db: Database) -> Self {
        CartService { db }
    }

    /// Gets the caller's cart.
    ///
    /// ## Returns
    /// `Ok(None)` when the user has no cart - a valid, non-error state
    /// meaning "empty".
    pub async fn get(&self, identity: &Identity) -> EngineResult<Option<Cart>> {
        Ok(self.db.carts().get_by_user(&identity.user_id).await?)
    }

    /// Adds a product to the caller's cart, merging into an existing line.
    ///
    /// Creates the cart lazily on first use, then recomputes the live total.
    pub async fn add_item(
        &self,
        identity: &Identity,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<Cart> {
        validation::validate_quantity(quantity)?;

        let products = self.db.products();
        let carts = self.db.carts();

        // The product must exist before it can be carted
        products
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", product_id))?;

        let cart = carts.get_or_create(&identity.user_id).await?;

        match carts.get_line_quantity(&cart.id, product_id).await? {
            Some(existing) => {
                // Merged quantity must still respect the per-line cap
                validation::validate_quantity(existing + quantity)?;
                carts
                    .set_line_quantity(&cart.id, product_id, existing + quantity)
                    .await?;
            }
            None => {
                if cart.lines.len() >= MAX_CART_LINES {
                    return Err(orderflow_core::ValidationError::OutOfRange {
                        field: "cart lines".to_string(),
                        min: 1,
                        max: MAX_CART_LINES as i64,
                    }
                    .into());
                }
                carts.upsert_line(&cart.id, product_id, quantity).await?;
            }
        }

        self.recompute_total(&cart.id).await?;

        info!(user_id = %identity.user_id, product_id = %product_id, quantity = %quantity, "Item added to cart");

        carts
            .get_by_user(&identity.user_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Cart", &identity.user_id))
    }

    /// Removes quantity from a line, dropping the line when the removal
    /// quantity is >= what the cart holds.
    pub async fn remove_item(
        &self,
        identity: &Identity,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<Cart> {
        validation::validate_quantity(quantity)?;

        let carts = self.db.carts();

        let cart = carts
            .get_by_user(&identity.user_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Cart", &identity.user_id))?;

        let existing = carts
            .get_line_quantity(&cart.id, product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Cart item", product_id))?;

        if quantity >= existing {
            carts.delete_line(&cart.id, product_id).await?;
        } else {
            carts
                .set_line_quantity(&cart.id, product_id, existing - quantity)
                .await?;
        }

        self.recompute_total(&cart.id).await?;

        info!(user_id = %identity.user_id, product_id = %product_id, quantity = %quantity, "Item removed from cart");

        carts
            .get_by_user(&identity.user_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Cart", &identity.user_id))
    }

    /// Recomputes the cart total from live catalog prices and persists it.
    async fn recompute_total(&self, cart_id: &str) -> EngineResult<()> {
        let carts = self.db.carts();
        let products = self.db.products();

        let lines = carts.get_lines(cart_id).await?;

        let mut joined: Vec<(Product, i64)> = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = products
                .get_by_id(&line.product_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Product", &line.product_id))?;
            joined.push((product, line.quantity));
        }

        let total = pricing::cart_total(joined.iter().map(|(p, q)| (p, *q)));
        carts.set_total(cart_id, total.cents()).await?;

        debug!(cart_id = %cart_id, total = %total, "Cart total recomputed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use orderflow_db::DbConfig;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed(db: &Database, id: &str, price_cents: i64, discount_bps: u32) {
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: id.to_string(),
                name: id.to_uppercase(),
                description: String::new(),
                price_cents,
                discount_bps,
                stock: 100,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_empty_is_none_not_error() {
        let db = test_db().await;
        let service = CartService::new(db);
        let identity = Identity::customer("u1");

        assert!(service.get(&identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_item_creates_cart_and_totals() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0).await;
        seed(&db, "p2", 500, 2000).await;

        let service = CartService::new(db);
        let identity = Identity::customer("u1");

        service.add_item(&identity, "p1", 2).await.unwrap();
        let cart = service.add_item(&identity, "p2", 1).await.unwrap();

        // 2 × $10.00 + 1 × $4.00 = $24.00
        assert_eq!(cart.total_cents, 2400);
        assert_eq!(cart.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_add_same_product_merges() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0).await;

        let service = CartService::new(db);
        let identity = Identity::customer("u1");

        service.add_item(&identity, "p1", 2).await.unwrap();
        let cart = service.add_item(&identity, "p1", 3).await.unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(cart.total_cents, 5000);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let db = test_db().await;
        let service = CartService::new(db);
        let identity = Identity::customer("u1");

        let err = service.add_item(&identity, "ghost", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Product", .. }));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0).await;

        let service = CartService::new(db);
        let identity = Identity::customer("u1");

        assert!(service.add_item(&identity, "p1", 0).await.is_err());
        assert!(service.add_item(&identity, "p1", -2).await.is_err());
    }

    #[tokio::test]
    async fn test_total_tracks_live_catalog_price() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0).await;
        seed(&db, "p2", 500, 0).await;

        let service = CartService::new(db.clone());
        let identity = Identity::customer("u1");

        service.add_item(&identity, "p1", 1).await.unwrap();

        // Catalog price changes between mutations
        let mut p1 = db.products().get_by_id("p1").await.unwrap().unwrap();
        p1.price_cents = 2000;
        db.products().update(&p1).await.unwrap();

        // Next mutation recomputes with the new price
        let cart = service.add_item(&identity, "p2", 1).await.unwrap();
        assert_eq!(cart.total_cents, 2500);
    }

    #[tokio::test]
    async fn test_remove_item_decrements_and_drops() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0).await;

        let service = CartService::new(db);
        let identity = Identity::customer("u1");

        service.add_item(&identity, "p1", 5).await.unwrap();

        let cart = service.remove_item(&identity, "p1", 2).await.unwrap();
        assert_eq!(cart.lines[0].quantity, 3);
        assert_eq!(cart.total_cents, 3000);

        // Removal quantity >= current quantity drops the whole line
        let cart = service.remove_item(&identity, "p1", 99).await.unwrap();
        assert!(cart.lines.is_empty());
        assert_eq!(cart.total_cents, 0);
    }

    #[tokio::test]
    async fn test_remove_missing_line_is_not_found() {
        let db = test_db().await;
        seed(&db, "p1", 1000, 0).await;
        seed(&db, "p2", 500, 0).await;

        let service = CartService::new(db);
        let identity = Identity::customer("u1");

        // No cart at all
        let err = service.remove_item(&identity, "p1", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Cart", .. }));

        // Cart exists but the line does not
        service.add_item(&identity, "p1", 1).await.unwrap();
        let err = service.remove_item(&identity, "p2", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Cart item", .. }));
    }
}
