//! # Pricing Module
//!
//! Explicit price-snapshot and total-recompute functions.
//!
//! ## Why Explicit Functions?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Pricing Call Sites                                   │
//! │                                                                         │
//! │  Cart mutation (add/remove)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cart_total() ──► written back to the cart row       (LIVE pricing)    │
//! │                                                                         │
//! │  Order placement                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  snapshot_line() per line ──► order_total()          (FROZEN pricing)  │
//! │                                                                         │
//! │  The workflows call these at the point of mutation. There are no       │
//! │  hidden lifecycle hooks recomputing totals behind the caller's back,   │
//! │  so every recompute is auditable and testable in isolation.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Asymmetry
//! Cart totals always re-read the current catalog price and discount.
//! Order totals are computed once from snapshots and never again.
//! Preserve this - it is a business rule.

use crate::money::Money;
use crate::types::{OrderLine, Product};

/// Computes a product's discounted unit price.
///
/// This is the price a customer actually pays per unit: the catalog price
/// with the catalog discount applied, rounded to whole cents.
///
/// ## Example
/// ```rust
/// use orderflow_core::pricing::discounted_unit_price;
/// # use orderflow_core::types::Product;
/// # use chrono::Utc;
/// # let product = Product {
/// #     id: "p".into(), name: "n".into(), description: String::new(),
/// #     price_cents: 500, discount_bps: 2000, stock: 1,
/// #     created_at: Utc::now(), updated_at: Utc::now(),
/// # };
/// // $5.00 at 20% off
/// assert_eq!(discounted_unit_price(&product).cents(), 400);
/// ```
pub fn discounted_unit_price(product: &Product) -> Money {
    product.price().apply_discount(product.discount())
}

/// Recomputes a cart total from *live* catalog data.
///
/// Takes the already-joined (product, quantity) pairs for every remaining
/// line. The caller re-reads the catalog before calling; this function never
/// caches anything.
pub fn cart_total<'a, I>(items: I) -> Money
where
    I: IntoIterator<Item = (&'a Product, i64)>,
{
    items
        .into_iter()
        .map(|(product, qty)| discounted_unit_price(product).multiply_quantity(qty))
        .sum()
}

/// Freezes one cart line into an order line.
///
/// Captures the discounted unit price at this instant; the resulting
/// `price_at_order_cents` is immutable for the life of the order.
pub fn snapshot_line(product: &Product, quantity: i64) -> OrderLine {
    OrderLine {
        product_id: product.id.clone(),
        quantity,
        price_at_order_cents: discounted_unit_price(product).cents(),
    }
}

/// Computes an order total from frozen lines.
///
/// Always equals the sum of line totals at creation time; called exactly
/// once per order, at placement.
pub fn order_total(lines: &[OrderLine]) -> Money {
    lines.iter().map(OrderLine::line_total).sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, price_cents: i64, discount_bps: u32) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            description: String::new(),
            price_cents,
            discount_bps,
            stock: 100,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_discounted_unit_price() {
        assert_eq!(discounted_unit_price(&product("p1", 1000, 0)).cents(), 1000);
        assert_eq!(discounted_unit_price(&product("p2", 500, 2000)).cents(), 400);
    }

    #[test]
    fn test_cart_total_reads_live_prices() {
        // (P1, $10.00, 0%, qty 2) + (P2, $5.00, 20%, qty 1) = $24.00
        let p1 = product("p1", 1000, 0);
        let p2 = product("p2", 500, 2000);

        let total = cart_total([(&p1, 2), (&p2, 1)]);
        assert_eq!(total.cents(), 2400);
    }

    #[test]
    fn test_snapshot_then_order_total() {
        let p1 = product("p1", 1000, 0);
        let p2 = product("p2", 500, 2000);

        let lines = vec![snapshot_line(&p1, 2), snapshot_line(&p2, 1)];
        assert_eq!(lines[0].price_at_order_cents, 1000);
        assert_eq!(lines[1].price_at_order_cents, 400);
        assert_eq!(order_total(&lines).cents(), 2400);
    }

    #[test]
    fn test_snapshot_is_insensitive_to_later_catalog_changes() {
        let mut p1 = product("p1", 1000, 0);
        let line = snapshot_line(&p1, 2);

        // Catalog price changes after the snapshot
        p1.price_cents = 9999;

        // The frozen line total is unaffected...
        assert_eq!(order_total(&[line]).cents(), 2000);
        // ...while a live cart total would see the new price
        assert_eq!(cart_total([(&p1, 2)]).cents(), 19998);
    }

    #[test]
    fn test_empty_totals_are_zero() {
        let no_items: [(&Product, i64); 0] = [];
        assert_eq!(cart_total(no_items).cents(), 0);
        assert_eq!(order_total(&[]).cents(), 0);
    }
}
