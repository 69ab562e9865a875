//! # Stripe Gateway Implementation
//!
//! `PaymentGateway` backed by the Stripe REST API.
//!
//! ## Intent Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stripe Intent Flow                                 │
//! │                                                                         │
//! │  create_intent()                                                       │
//! │       │  POST /v1/payment_intents (form-encoded)                       │
//! │       │    amount, currency, metadata[order_id], metadata[user_id],    │
//! │       │    shipping[...], payment_method_types[]=card                  │
//! │       ▼                                                                 │
//! │  PaymentIntent { id: "pi_...", client_secret, status, ... }            │
//! │                                                                         │
//! │  retrieve_intent("pi_...")                                             │
//! │       │  GET /v1/payment_intents/pi_...                                │
//! │       ▼                                                                 │
//! │  PaymentIntent { status: "succeeded" | "processing" | ... }            │
//! │                                                                         │
//! │  Amounts are cents on both sides - Stripe's smallest-unit integers     │
//! │  map 1:1 onto our Money cents, no conversion anywhere.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::types::{CreateIntentRequest, IntentMetadata, PaymentIntent};
use crate::PaymentGateway;

/// Stripe-backed payment gateway client.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: Client,
    config: GatewayConfig,
}

/// Wire shape of a Stripe payment intent (the fields we read).
#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    metadata: IntentMetadata,
}

impl From<StripeIntent> for PaymentIntent {
    fn from(intent: StripeIntent) -> Self {
        PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            status: intent.status,
            amount_cents: intent.amount,
            currency: intent.currency,
            metadata: intent.metadata,
        }
    }
}

impl StripeGateway {
    /// Creates a new client from a configuration.
    pub fn new(config: GatewayConfig) -> Self {
        StripeGateway {
            client: Client::new(),
            config,
        }
    }

    /// Creates a new client with configuration from the environment.
    ///
    /// ## Errors
    /// Returns `GatewayError::MissingSecret` if `ORDERFLOW_GATEWAY_SECRET`
    /// is not set.
    pub fn from_env() -> GatewayResult<Self> {
        Ok(Self::new(GatewayConfig::load()?))
    }

    /// Maps a non-success HTTP response to a GatewayError.
    async fn error_for(&self, response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        warn!(status = %status, "Gateway returned error response");

        match status {
            StatusCode::NOT_FOUND => GatewayError::IntentNotFound(body),
            StatusCode::UNAUTHORIZED => GatewayError::Unauthorized,
            _ => GatewayError::Api {
                status: status.as_u16(),
                message: body,
            },
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: CreateIntentRequest) -> GatewayResult<PaymentIntent> {
        debug!(order_id = %request.order_id, amount = %request.amount_cents, "Creating payment intent");

        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), request.amount_cents.to_string()),
            ("currency".into(), request.currency.clone()),
            ("payment_method_types[]".into(), "card".into()),
            ("metadata[order_id]".into(), request.order_id.clone()),
            ("metadata[user_id]".into(), request.user_id.clone()),
        ];

        if let Some(shipping) = &request.shipping {
            form.push(("shipping[name]".into(), shipping.name.clone()));
            form.push(("shipping[address][line1]".into(), shipping.street.clone()));
            form.push(("shipping[address][city]".into(), shipping.city.clone()));
            form.push(("shipping[address][state]".into(), shipping.state.clone()));
            form.push(("shipping[address][postal_code]".into(), shipping.zip.clone()));
            form.push(("shipping[address][country]".into(), shipping.country.clone()));
        }

        let response = self
            .client
            .post(format!("{}/payment_intents", self.config.base_url))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.error_for(response).await);
        }

        let intent: StripeIntent = response
            .json()
            .await
            .map_err(|e| GatewayError::ResponseParseFailed(e.to_string()))?;

        debug!(intent_id = %intent.id, status = %intent.status, "Intent created");
        Ok(intent.into())
    }

    async fn retrieve_intent(&self, intent_id: &str) -> GatewayResult<PaymentIntent> {
        debug!(intent_id = %intent_id, "Retrieving payment intent");

        let response = self
            .client
            .get(format!(
                "{}/payment_intents/{intent_id}",
                self.config.base_url
            ))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.error_for(response).await);
        }

        let intent: StripeIntent = response
            .json()
            .await
            .map_err(|e| GatewayError::ResponseParseFailed(e.to_string()))?;

        Ok(intent.into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripe_intent_deserializes() {
        // Representative slice of a real intent payload
        let json = r#"{
            "id": "pi_3Abc",
            "object": "payment_intent",
            "amount": 2400,
            "client_secret": "pi_3Abc_secret_xyz",
            "currency": "usd",
            "status": "succeeded",
            "metadata": { "order_id": "o1", "user_id": "u1" }
        }"#;

        let intent: StripeIntent = serde_json::from_str(json).unwrap();
        let intent: PaymentIntent = intent.into();

        assert_eq!(intent.id, "pi_3Abc");
        assert_eq!(intent.amount_cents, 2400);
        assert_eq!(intent.status, "succeeded");
        assert_eq!(intent.metadata.user_id, "u1");
    }

    #[test]
    fn test_stripe_intent_without_metadata() {
        let json = r#"{
            "id": "pi_3Abc",
            "amount": 100,
            "client_secret": null,
            "currency": "usd",
            "status": "processing"
        }"#;

        let intent: StripeIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.metadata, IntentMetadata::default());
        assert!(intent.client_secret.is_none());
    }
}
