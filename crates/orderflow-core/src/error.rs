//! # Error Types
//!
//! Domain-specific error types for orderflow-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  orderflow-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  orderflow-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  orderflow-gateway errors (separate crate)                             │
//! │  └── GatewayError     - Payment gateway failures                       │
//! │                                                                         │
//! │  orderflow-engine errors (separate crate)                              │
//! │  └── EngineError      - What workflow callers see                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, statuses, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::types::{OrderStatus, PaymentStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An order status transition outside the allowed table.
    ///
    /// ## When This Occurs
    /// - Shipping an order that was never charged (`pending → shipped`)
    /// - Cancelling an order that already shipped
    /// - Re-delivering any terminal status
    ///
    /// ## Allowed Transitions
    /// ```text
    /// pending ──► processing ──► shipped ──► delivered
    ///    │             │
    ///    └──► cancelled◄┘        (delivered / cancelled are terminal)
    /// ```
    #[error("Invalid status transition from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A payment status change outside the allowed lifecycle.
    ///
    /// ## When This Occurs
    /// - Refunding a payment that never completed
    /// - Completing a payment that already failed
    #[error("Invalid payment transition from {from:?} to {to:?}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Payment amount does not match the order total.
    ///
    /// ## When This Occurs
    /// - Creating a Payment whose amount differs from the order's frozen total
    /// - A gateway intent reporting a different amount than the stored payment
    ///
    /// This is always a hard failure, never silently adjusted.
    #[error("Payment amount {actual_cents} does not match order amount {expected_cents}")]
    AmountMismatch {
        expected_cents: i64,
        actual_cents: i64,
    },

    /// A refund was recorded without a reason.
    #[error("Refund reason is required when payment is refunded")]
    RefundReasonRequired,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
