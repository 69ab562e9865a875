//! # orderflow-engine: Fulfillment & Reconciliation Workflows
//!
//! The orchestration core of Orderflow: converts carts into durable orders,
//! reserves stock, and reconciles payment-gateway state with internal
//! Order/Payment state.
//!
//! ## Control Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Orderflow Control Flow                           │
//! │                                                                         │
//! │  CartService ──► FulfillmentService ──► StockLedger (reserve)          │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                  Order created (pending)                               │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  PaymentService::initiate ──► gateway intent ──► order processing      │
//! │                        │                                                │
//! │            [async gateway callback / poll]                             │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  PaymentService::reconcile ──► Payment/Order status                    │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  StockLedger: no-op on success, release on cancel/failure              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants This Crate Owns
//!
//! 1. Stock never goes negative, and a failed multi-line reservation
//!    releases every line it already took (all-or-nothing)
//! 2. A cart is never double-charged: the cart dies in the same
//!    transaction that creates its order
//! 3. Payment and order status stay consistent under retries and
//!    out-of-order gateway deliveries (idempotent reconciliation)
//!
//! ## Modules
//!
//! - [`stock`] - Batched all-or-nothing stock reservation
//! - [`cart`] - Cart aggregate operations (live pricing)
//! - [`fulfillment`] - Cart → Order conversion + status state machine
//! - [`payments`] - Payment initiation and gateway reconciliation
//! - [`error`] - The error surface workflow callers see

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod fulfillment;
pub mod payments;
pub mod stock;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::CartService;
pub use error::{EngineError, EngineResult};
pub use fulfillment::FulfillmentService;
pub use payments::{InitiatedPayment, PaymentService, ReconcileOutcome};
pub use stock::StockLedger;

use std::sync::Arc;

use orderflow_db::Database;
use orderflow_gateway::PaymentGateway;

// =============================================================================
// Engine Facade
// =============================================================================

/// Bundles every workflow service over one database and gateway.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("orderflow.db")).await?;
/// let gateway = Arc::new(StripeGateway::from_env()?);
/// let engine = Engine::new(db, gateway);
///
/// engine.carts().add_item(&identity, &product_id, 2).await?;
/// let order = engine.fulfillment().place_order(&identity, address, method).await?;
/// let initiated = engine.payments().initiate(&identity, &order.id, method).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    carts: CartService,
    fulfillment: FulfillmentService,
    payments: PaymentService,
}

impl Engine {
    /// Creates an engine over a database and a payment gateway.
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>) -> Self {
        Engine {
            carts: CartService::new(db.clone()),
            fulfillment: FulfillmentService::new(db.clone()),
            payments: PaymentService::new(db, gateway),
        }
    }

    /// Cart aggregate operations.
    pub fn carts(&self) -> &CartService {
        &self.carts
    }

    /// Fulfillment workflow operations.
    pub fn fulfillment(&self) -> &FulfillmentService {
        &self.fulfillment
    }

    /// Payment reconciliation operations.
    pub fn payments(&self) -> &PaymentService {
        &self.payments
    }
}
