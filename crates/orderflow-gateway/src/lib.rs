//! # orderflow-gateway: Payment Gateway Client
//!
//! This crate owns all traffic to the external payment gateway and exposes
//! it behind one narrow, stateless seam.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Gateway Seam                                       │
//! │                                                                         │
//! │  orderflow-engine (initiate / reconcile)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  trait PaymentGateway ── create_intent() / retrieve_intent()           │
//! │       │                                                                 │
//! │       ├──► StripeGateway   (production, reqwest over REST)             │
//! │       └──► MockGateway     (tests, in-memory)                          │
//! │                                                                         │
//! │  The engine never learns which implementation it holds. Outcome        │
//! │  interpretation (what "succeeded" does to Order/Payment state) stays   │
//! │  in the engine; this crate only moves bytes.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Env-driven gateway configuration
//! - [`types`] - Intent request/response types
//! - [`stripe`] - Stripe REST implementation
//! - [`mock`] - In-memory test double
//! - [`error`] - Gateway error taxonomy

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod mock;
pub mod stripe;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use mock::MockGateway;
pub use stripe::StripeGateway;
pub use types::{CreateIntentRequest, IntentMetadata, PaymentIntent, ShippingDetails};

use async_trait::async_trait;

// =============================================================================
// The Seam
// =============================================================================

/// The payment-gateway interface the engine depends on.
///
/// Implementations must be stateless from the caller's point of view:
/// every operation is a standalone round trip, safe to issue from any
/// number of concurrent requests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent for the given amount and metadata.
    ///
    /// ## Errors
    /// Network and API failures surface as [`GatewayError`]; the engine
    /// collapses them into its generic gateway-unavailable error. No
    /// retries happen at this layer.
    async fn create_intent(&self, request: CreateIntentRequest) -> GatewayResult<PaymentIntent>;

    /// Retrieves the current state of an intent by id.
    async fn retrieve_intent(&self, intent_id: &str) -> GatewayResult<PaymentIntent>;
}
