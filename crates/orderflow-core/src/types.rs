//! # Domain Types
//!
//! Core domain types used throughout Orderflow.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  price_cents    │   │  lines (frozen) │   │  order_id (1:1) │       │
//! │  │  discount_bps   │   │  status machine │   │  status machine │       │
//! │  │  stock (≥ 0)    │   │  history log    │   │  transaction_id │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Cart        │   │  OrderStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  one per user   │   │  Pending        │   │  CreditCard     │       │
//! │  │  live totals    │   │  Processing ... │   │  DebitCard      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pricing Asymmetry (deliberate!)
//! Cart totals are recomputed from *live* catalog prices on every mutation.
//! Order totals are *frozen* at placement time (`price_at_order_cents`).
//! This asymmetry is a business rule, not an accident - do not "fix" it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Discount Rate
// =============================================================================

/// Catalog discount represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 2000 bps = 20% off
///
/// Integer bps keep discount math exact; the original percentage is only
/// reconstructed for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a discount rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a discount rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero discount rate.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
///
/// The catalog itself is a plain collaborator; the fields that matter to the
/// fulfillment core are `price_cents`, `discount_bps` and `stock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional longer description.
    pub description: String,

    /// Undiscounted unit price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Catalog discount in basis points (2000 = 20%).
    pub discount_bps: u32,

    /// Available stock. Never negative; mutated only by the stock ledger.
    pub stock: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the undiscounted price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the catalog discount rate.
    #[inline]
    pub fn discount(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One (product, quantity) pairing inside a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    /// Product ID (UUID).
    pub product_id: String,

    /// Quantity in cart. Always >= 1; duplicates merge by incrementing.
    pub quantity: i64,
}

/// A user's pending item selections.
///
/// ## Invariants
/// - Exactly one cart per user (storage-enforced unique constraint)
/// - Line quantity is always >= 1
/// - `total_cents` reflects *live* catalog pricing, recomputed on every
///   mutation - unlike Order totals, which are frozen at placement
///
/// ## Lifecycle
/// Created lazily on first add-to-cart; deleted the instant it is
/// successfully converted into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub lines: Vec<CartLine>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Returns the live total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Checks if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Shipping Address
// =============================================================================

/// Structured shipping address attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays. A closed set; anything else is a validation error.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
}

// =============================================================================
// Order Status
// =============================================================================

/// The fulfillment status of an order.
///
/// ## State Machine
/// ```text
/// pending ──► processing ──► shipped ──► delivered
///    │             │
///    └─────────────┴──► cancelled
///
/// delivered and cancelled are terminal.
/// ```
/// Every transition outside this table is rejected, never silently written.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, stock reserved, payment not yet initiated.
    Pending,
    /// Payment initiated or charged; order being prepared.
    Processing,
    /// Handed to the carrier; tracking number assigned.
    Shipped,
    /// Received by the customer (terminal).
    Delivered,
    /// Cancelled before shipment (terminal); stock released.
    Cancelled,
}

impl OrderStatus {
    /// Returns the statuses this one may transition to.
    pub const fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Processing, OrderStatus::Cancelled],
            OrderStatus::Processing => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered => &[],
            OrderStatus::Cancelled => &[],
        }
    }

    /// Checks whether `self → to` is in the transition table.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Checks if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Order Payment Status
// =============================================================================

/// The charge state of an order, mirrored from reconciled gateway outcomes.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    /// No successful charge yet (initial state, and after a failed attempt).
    NotCharged,
    /// The gateway reported the charge as in flight.
    Processing,
    /// The gateway confirmed the charge.
    Charged,
    /// The charge was refunded.
    Refunded,
}

impl Default for OrderPaymentStatus {
    fn default() -> Self {
        OrderPaymentStatus::NotCharged
    }
}

// =============================================================================
// Order
// =============================================================================

/// One purchased line inside an order.
///
/// Uses the snapshot pattern: the discounted unit price is frozen at
/// order-creation time and never recomputed from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    /// Product ID (UUID).
    pub product_id: String,

    /// Quantity purchased.
    pub quantity: i64,

    /// Discounted unit price in cents at order-creation time (frozen).
    pub price_at_order_cents: i64,
}

impl OrderLine {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn price_at_order(&self) -> Money {
        Money::from_cents(self.price_at_order_cents)
    }

    /// Line total (frozen unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price_at_order().multiply_quantity(self.quantity)
    }
}

/// One entry in an order's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub changed_at: DateTime<Utc>,
}

/// An immutable-once-placed record of purchased items.
///
/// ## Invariants
/// - `lines` and `total_cents` never change after creation
/// - `total_cents` equals the sum of line totals at creation time,
///   not a live recomputation
/// - `status_history` gains exactly one entry per applied transition,
///   in chronological order
/// - `tracking_number` is assigned exactly once, on first entry to Shipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub lines: Vec<OrderLine>,
    pub total_cents: i64,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: OrderPaymentStatus,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the frozen total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// The lifecycle of a payment record.
///
/// ## State Machine
/// ```text
/// pending ──┬──► processing ──┬──► completed ──► refunded
///           │                 │
///           └──► completed    └──► failed ──► (retry) processing/completed
///           └──► failed
/// ```
/// A gateway intent can settle straight from pending (synchronous capture),
/// and a failed intent can be retried with a new payment method, so Failed
/// is not terminal. Refunds are only possible from Completed.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Returns the statuses this one may transition to.
    pub const fn allowed_transitions(&self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Pending => &[
                PaymentStatus::Processing,
                PaymentStatus::Completed,
                PaymentStatus::Failed,
            ],
            PaymentStatus::Processing => &[PaymentStatus::Completed, PaymentStatus::Failed],
            PaymentStatus::Failed => &[PaymentStatus::Processing, PaymentStatus::Completed],
            PaymentStatus::Completed => &[PaymentStatus::Refunded],
            PaymentStatus::Refunded => &[],
        }
    }

    /// Checks whether `self → to` is in the transition table.
    pub fn can_transition_to(&self, to: PaymentStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment record, one per order (storage-enforced unique constraint).
///
/// Created once when payment is initiated; never deleted; mutated only by
/// the reconciliation engine or an explicit refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub order_id: String,

    /// Amount in cents. Must equal the order's frozen total at creation.
    pub amount_cents: i64,

    pub method: PaymentMethod,
    pub status: PaymentStatus,

    /// Gateway-assigned intent id. Unique when present.
    pub transaction_id: Option<String>,

    /// Required if and only if status is Refunded.
    pub refund_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Caller role. Admins bypass ownership checks and may mutate order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

/// An already-authenticated caller.
///
/// Authentication itself happens upstream; every engine operation only
/// receives the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    /// Creates a customer identity.
    pub fn customer(user_id: impl Into<String>) -> Self {
        Identity {
            user_id: user_id.into(),
            role: Role::Customer,
        }
    }

    /// Creates an admin identity.
    pub fn admin(user_id: impl Into<String>) -> Self {
        Identity {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    /// Checks for the admin role.
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_rate_from_bps() {
        let rate = DiscountRate::from_bps(2000);
        assert_eq!(rate.bps(), 2000);
        assert!((rate.percentage() - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_discount_rate_from_percentage() {
        let rate = DiscountRate::from_percentage(20.0);
        assert_eq!(rate.bps(), 2000);
    }

    #[test]
    fn test_order_status_transition_table() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Pending.can_transition_to(Delivered));

        assert!(Processing.can_transition_to(Shipped));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Processing.can_transition_to(Pending));

        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Shipped.can_transition_to(Cancelled));

        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Shipped.is_terminal());
    }

    #[test]
    fn test_payment_status_transitions() {
        use PaymentStatus::*;

        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Completed));
        assert!(Failed.can_transition_to(Completed)); // gateway retry
        assert!(Completed.can_transition_to(Refunded));
        assert!(!Refunded.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Refunded));
    }

    #[test]
    fn test_order_line_total() {
        let line = OrderLine {
            product_id: "p1".to_string(),
            quantity: 3,
            price_at_order_cents: 400,
        };
        assert_eq!(line.line_total().cents(), 1200);
    }

    #[test]
    fn test_identity_roles() {
        assert!(Identity::admin("a").is_admin());
        assert!(!Identity::customer("c").is_admin());
    }
}
