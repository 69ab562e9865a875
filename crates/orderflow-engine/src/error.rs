//! # Engine Error Types
//!
//! The error surface workflow callers see.
//!
//! ## Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Taxonomy                             │
//! │                                                                         │
//! │  NotFound                 cart/order/payment/product absent, or not    │
//! │                           owned by the caller                          │
//! │  EmptyCart                placing an order from nothing                │
//! │  InsufficientStock        reservation lost; names the product         │
//! │  AlreadyPaidOrPending     second initiate() for one order             │
//! │  UnexpectedGatewayStatus  outcome outside the known set               │
//! │  GatewayUnavailable       network/API failure; caller may retry       │
//! │  Forbidden                intent owner mismatch / missing role        │
//! │  Core                     InvalidTransition + ValidationFailed        │
//! │  Db                       storage failures                            │
//! │                                                                         │
//! │  Every failure inside the fulfillment workflow rolls back partial      │
//! │  reservations before one of these propagates. None is fatal to the    │
//! │  process - each is scoped to its single request.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use orderflow_core::{CoreError, OrderStatus, ValidationError};
use orderflow_db::DbError;
use orderflow_gateway::GatewayError;

/// Workflow errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Entity absent, or present but not owned by the caller.
    ///
    /// Ownership failures deliberately look identical to absence so a
    /// caller cannot probe for other users' order ids.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The cart has no lines; there is nothing to convert.
    #[error("Cart is empty")]
    EmptyCart,

    /// A stock reservation failed. Everything reserved earlier in the same
    /// attempt has already been released.
    #[error("Insufficient stock for {name}")]
    InsufficientStock { product_id: String, name: String },

    /// A payment for this order already exists.
    #[error("Order already paid or being processed")]
    AlreadyPaidOrPending,

    /// The gateway reported a status outside the reconciliation table.
    #[error("Unexpected payment status: {0}")]
    UnexpectedGatewayStatus(String),

    /// The payment gateway could not be reached or errored.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The caller is not allowed to perform this operation.
    #[error("Access denied")]
    Forbidden,

    /// Deleting anything but a pending order is refused.
    #[error("Cannot delete order {order_id} in status {status:?}")]
    NotDeletable {
        order_id: String,
        status: OrderStatus,
    },

    /// Business rule violation (invalid transition, validation failure).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl EngineError {
    /// Creates a NotFound error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Maps gateway failures onto the engine surface.
///
/// `IntentNotFound` keeps its identity (the caller passed a bad id);
/// everything else collapses into the generic unavailable error - retry
/// policy belongs to the caller, not the core.
impl From<GatewayError> for EngineError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::IntentNotFound(id) => EngineError::NotFound {
                entity: "Payment intent",
                id,
            },
            other => EngineError::GatewayUnavailable(other.to_string()),
        }
    }
}

/// Result type for workflow operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_mapping() {
        let err: EngineError = GatewayError::IntentNotFound("pi_1".to_string()).into();
        assert!(matches!(err, EngineError::NotFound { entity: "Payment intent", .. }));

        let err: EngineError = GatewayError::RequestFailed("timeout".to_string()).into();
        assert!(matches!(err, EngineError::GatewayUnavailable(_)));
    }

    #[test]
    fn test_validation_error_mapping() {
        let err: EngineError = ValidationError::RefundReasonRequired.into();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));
    }

    #[test]
    fn test_messages() {
        let err = EngineError::InsufficientStock {
            product_id: "p2".to_string(),
            name: "P2".to_string(),
        };
        assert_eq!(err.to_string(), "Insufficient stock for P2");

        assert_eq!(
            EngineError::AlreadyPaidOrPending.to_string(),
            "Order already paid or being processed"
        );
    }
}
