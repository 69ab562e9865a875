//! # Validation Module
//!
//! Input validation utilities for Orderflow.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP layer, out of scope)                            │
//! │  ├── Basic format checks, deserialization                              │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine workflows (Rust)                                      │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (cart.user, payment.order)                     │
//! │  └── CHECK constraints (stock >= 0, quantity >= 1)                     │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PaymentStatus, ShippingAddress};
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Quantity
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed [`MAX_LINE_QUANTITY`]
///
/// ## Example
/// ```rust
/// use orderflow_core::validation::validate_quantity;
///
/// assert!(validate_quantity(5).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-3).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Shipping Address
// =============================================================================

/// Validates a shipping address.
///
/// ## Rules
/// Every field is required and non-blank; free-form fields are capped at
/// 200 characters to keep storage bounded.
pub fn validate_shipping_address(address: &ShippingAddress) -> ValidationResult<()> {
    let fields = [
        ("name", &address.name),
        ("street", &address.street),
        ("city", &address.city),
        ("state", &address.state),
        ("zip", &address.zip),
        ("country", &address.country),
    ];

    for (field, value) in fields {
        let value = value.trim();

        if value.is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }

        if value.len() > 200 {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                max: 200,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Payment
// =============================================================================

/// Validates that a payment amount equals the order's frozen total.
///
/// A mismatch is a hard failure - it is never clamped or adjusted.
pub fn validate_amount_matches(order_total: Money, amount: Money) -> ValidationResult<()> {
    if order_total != amount {
        return Err(ValidationError::AmountMismatch {
            expected_cents: order_total.cents(),
            actual_cents: amount.cents(),
        });
    }
    Ok(())
}

/// Validates the refund-reason rule: a reason is required if and only if
/// the payment status is Refunded.
pub fn validate_refund_reason(
    status: PaymentStatus,
    reason: Option<&str>,
) -> ValidationResult<()> {
    let has_reason = reason.map(str::trim).is_some_and(|r| !r.is_empty());

    if status == PaymentStatus::Refunded && !has_reason {
        return Err(ValidationError::RefundReasonRequired);
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_shipping_address() {
        assert!(validate_shipping_address(&address()).is_ok());

        let mut bad = address();
        bad.street = "   ".to_string();
        let err = validate_shipping_address(&bad).unwrap_err();
        assert_eq!(err.to_string(), "street is required");

        let mut long = address();
        long.city = "x".repeat(201);
        assert!(validate_shipping_address(&long).is_err());
    }

    #[test]
    fn test_validate_amount_matches() {
        let total = Money::from_cents(2400);
        assert!(validate_amount_matches(total, Money::from_cents(2400)).is_ok());
        assert!(validate_amount_matches(total, Money::from_cents(2500)).is_err());
    }

    #[test]
    fn test_validate_refund_reason() {
        assert!(validate_refund_reason(PaymentStatus::Refunded, Some("damaged item")).is_ok());
        assert!(validate_refund_reason(PaymentStatus::Refunded, None).is_err());
        assert!(validate_refund_reason(PaymentStatus::Refunded, Some("  ")).is_err());
        // Reason is optional for every other status
        assert!(validate_refund_reason(PaymentStatus::Completed, None).is_ok());
    }
}
