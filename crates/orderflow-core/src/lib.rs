//! # orderflow-core: Pure Business Logic for Orderflow
//!
//! This crate is the **heart** of Orderflow. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Orderflow Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  orderflow-engine (Workflows)                   │   │
//! │  │    add_to_cart ──► place_order ──► initiate ──► reconcile      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ orderflow-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ snapshots │  │   rules   │  │   │
//! │  │   │   Order   │  │ Discount  │  │  totals   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        orderflow-db (SQLite)  ·  orderflow-gateway (Stripe)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Cart, Order, Payment, state machines)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Explicit price-snapshot and total-recompute functions
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//! 5. **Explicit Pricing**: Price snapshots and total recomputation are named
//!    functions invoked by the workflows at the point of mutation, never
//!    hidden lifecycle callbacks
//!
//! ## Example Usage
//!
//! ```rust
//! use orderflow_core::money::Money;
//! use orderflow_core::types::DiscountRate;
//!
//! // Create money from cents (never from floats!)
//! let price = Money::from_cents(500); // $5.00
//!
//! // Apply a catalog discount
//! let rate = DiscountRate::from_bps(2000); // 20%
//! let discounted = price.apply_discount(rate);
//!
//! // $5.00 at 20% off = $4.00
//! assert_eq!(discounted.cents(), 400);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use orderflow_core::Money` instead of
// `use orderflow_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single line in a cart or order
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
/// Configurable per-deployment in future versions.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum distinct lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and keeps reservation batches bounded.
pub const MAX_CART_LINES: usize = 100;
