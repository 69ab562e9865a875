//! # Gateway Types
//!
//! Request and response types for the payment-gateway seam.
//!
//! ## Design Note
//! These types are deliberately gateway-shaped, not domain-shaped: amounts
//! are raw cents, the intent status is the gateway's own string, and the
//! metadata is plain strings. Interpreting an outcome (what `succeeded`
//! means for Order/Payment state) is the engine's job, so this crate never
//! depends on orderflow-core.

use serde::{Deserialize, Serialize};

// =============================================================================
// Intent Status Strings
// =============================================================================

/// Gateway status string for a settled charge.
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// Gateway status string for a charge that needs a (new) payment method.
pub const STATUS_REQUIRES_PAYMENT_METHOD: &str = "requires_payment_method";

/// Gateway status string for a charge still in flight.
pub const STATUS_PROCESSING: &str = "processing";

// =============================================================================
// Requests
// =============================================================================

/// Shipping details forwarded to the gateway with an intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

/// Everything needed to create a payment intent.
#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    /// Charge amount in cents.
    pub amount_cents: i64,

    /// ISO currency code, lowercase (e.g. "usd").
    pub currency: String,

    /// The order this intent pays for; echoed back on retrieval.
    pub order_id: String,

    /// The owning user; reconciliation verifies the caller against this.
    pub user_id: String,

    /// Optional shipping details for fraud checks / receipts.
    pub shipping: Option<ShippingDetails>,
}

// =============================================================================
// Responses
// =============================================================================

/// Metadata we attach at creation and read back at reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMetadata {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub user_id: String,
}

/// A payment intent as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Gateway-assigned intent id (our `transaction_id`).
    pub id: String,

    /// Secret the frontend uses to confirm the intent. Present on
    /// creation; may be absent on retrieval.
    pub client_secret: Option<String>,

    /// Gateway-reported status string ("succeeded", "processing", ...).
    /// Anything outside the known set is surfaced verbatim so the engine
    /// can reject it explicitly.
    pub status: String,

    /// Charge amount in cents as the gateway recorded it.
    pub amount_cents: i64,

    /// ISO currency code.
    pub currency: String,

    /// Metadata attached at creation.
    pub metadata: IntentMetadata,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_json_roundtrip() {
        let intent = PaymentIntent {
            id: "pi_123".to_string(),
            client_secret: Some("pi_123_secret".to_string()),
            status: STATUS_SUCCEEDED.to_string(),
            amount_cents: 2400,
            currency: "usd".to_string(),
            metadata: IntentMetadata {
                order_id: "o1".to_string(),
                user_id: "u1".to_string(),
            },
        };

        let json = serde_json::to_string(&intent).unwrap();
        let back: PaymentIntent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "pi_123");
        assert_eq!(back.metadata.order_id, "o1");
    }

    #[test]
    fn test_metadata_defaults_when_missing() {
        // A gateway response without metadata fields still parses
        let back: IntentMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(back.order_id, "");
        assert_eq!(back.user_id, "");
    }
}
