//! # Mock Gateway
//!
//! In-memory `PaymentGateway` for tests and local development.
//!
//! ## Capabilities
//! - Creates intents with generated `pi_...` ids and client secrets
//! - Test hooks to flip an intent's status (simulating the asynchronous
//!   gateway outcome) and to tamper with its recorded amount
//! - Can be switched into an unavailable mode where every call fails,
//!   for exercising the GatewayUnavailable path

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::types::{CreateIntentRequest, IntentMetadata, PaymentIntent, STATUS_PROCESSING};
use crate::PaymentGateway;

/// In-memory gateway double.
///
/// Cloning shares the underlying intent store, so a test can hold one
/// handle while the engine holds another.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    intents: HashMap<String, PaymentIntent>,
    unavailable: bool,
    created_count: usize,
}

impl MockGateway {
    /// Creates an empty mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the network were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Sets the gateway-reported status of an existing intent.
    ///
    /// ## Panics
    /// Panics if the intent does not exist - that is a test bug.
    pub fn set_intent_status(&self, intent_id: &str, status: &str) {
        let mut state = self.lock();
        let intent = state
            .intents
            .get_mut(intent_id)
            .unwrap_or_else(|| panic!("mock intent {intent_id} does not exist"));
        intent.status = status.to_string();
    }

    /// Overwrites the gateway-recorded amount of an existing intent.
    ///
    /// For amount-mismatch tests only; a real gateway never does this.
    pub fn set_intent_amount(&self, intent_id: &str, amount_cents: i64) {
        let mut state = self.lock();
        let intent = state
            .intents
            .get_mut(intent_id)
            .unwrap_or_else(|| panic!("mock intent {intent_id} does not exist"));
        intent.amount_cents = amount_cents;
    }

    /// Number of intents created so far.
    pub fn created_count(&self) -> usize {
        self.lock().created_count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().expect("mock gateway mutex poisoned")
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(&self, request: CreateIntentRequest) -> GatewayResult<PaymentIntent> {
        let mut state = self.lock();

        if state.unavailable {
            return Err(GatewayError::RequestFailed(
                "mock gateway unavailable".to_string(),
            ));
        }

        let id = format!("pi_{}", Uuid::new_v4().simple());
        let intent = PaymentIntent {
            id: id.clone(),
            client_secret: Some(format!("{id}_secret_{}", Uuid::new_v4().simple())),
            // New intents start in flight; tests flip the status to
            // simulate the gateway's asynchronous outcome
            status: STATUS_PROCESSING.to_string(),
            amount_cents: request.amount_cents,
            currency: request.currency,
            metadata: IntentMetadata {
                order_id: request.order_id,
                user_id: request.user_id,
            },
        };

        state.intents.insert(id, intent.clone());
        state.created_count += 1;

        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> GatewayResult<PaymentIntent> {
        let state = self.lock();

        if state.unavailable {
            return Err(GatewayError::RequestFailed(
                "mock gateway unavailable".to_string(),
            ));
        }

        state
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::IntentNotFound(intent_id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::STATUS_SUCCEEDED;

    fn request() -> CreateIntentRequest {
        CreateIntentRequest {
            amount_cents: 2400,
            currency: "usd".to_string(),
            order_id: "o1".to_string(),
            user_id: "u1".to_string(),
            shipping: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_retrieve() {
        let gateway = MockGateway::new();

        let created = gateway.create_intent(request()).await.unwrap();
        assert!(created.client_secret.is_some());
        assert_eq!(created.status, STATUS_PROCESSING);

        let retrieved = gateway.retrieve_intent(&created.id).await.unwrap();
        assert_eq!(retrieved.amount_cents, 2400);
        assert_eq!(retrieved.metadata.user_id, "u1");
        assert_eq!(gateway.created_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_intent_is_not_found() {
        let gateway = MockGateway::new();
        let err = gateway.retrieve_intent("pi_ghost").await.unwrap_err();
        assert!(matches!(err, GatewayError::IntentNotFound(_)));
    }

    #[tokio::test]
    async fn test_status_flip() {
        let gateway = MockGateway::new();
        let created = gateway.create_intent(request()).await.unwrap();

        gateway.set_intent_status(&created.id, STATUS_SUCCEEDED);
        let retrieved = gateway.retrieve_intent(&created.id).await.unwrap();
        assert_eq!(retrieved.status, STATUS_SUCCEEDED);
    }

    #[tokio::test]
    async fn test_unavailable_mode() {
        let gateway = MockGateway::new();
        gateway.set_unavailable(true);

        let err = gateway.create_intent(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::RequestFailed(_)));
    }
}
