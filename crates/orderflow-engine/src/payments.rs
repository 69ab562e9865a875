//! # Payment Reconciliation Engine
//!
//! Creates gateway payment intents and reconciles gateway-reported outcomes
//! into local Payment/Order state.
//!
//! ## Outcome Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            Gateway outcome → local state                                │
//! │                                                                         │
//! │  succeeded                → Payment: completed                         │
//! │                             Order:   charged, status → processing     │
//! │  requires_payment_method  → Payment: failed                            │
//! │                             Order:   not_charged, status unchanged    │
//! │  processing               → Payment: processing                        │
//! │                             Order:   processing,  status unchanged    │
//! │  anything else            → UnexpectedGatewayStatus, nothing written  │
//! │                                                                         │
//! │  Reconciliation is idempotent: re-delivering an already-applied        │
//! │  outcome (duplicate webhook, retried poll) changes nothing and is      │
//! │  not an error. A stale outcome arriving after a more final one         │
//! │  (e.g. requires_payment_method after succeeded) is skipped - the      │
//! │  payment state machine refuses to move backwards.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use orderflow_core::{
    validation, Identity, Money, Order, OrderPaymentStatus, OrderStatus, Payment, PaymentMethod,
    PaymentStatus,
};
use orderflow_db::Database;
use orderflow_gateway::types::{
    STATUS_PROCESSING, STATUS_REQUIRES_PAYMENT_METHOD, STATUS_SUCCEEDED,
};
use orderflow_gateway::{CreateIntentRequest, PaymentGateway, ShippingDetails};

/// Currency every intent is created in.
const CURRENCY: &str = "usd";

/// Result of initiating a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatedPayment {
    /// The stored payment record (status: pending).
    pub payment: Payment,

    /// Secret the frontend uses to confirm the gateway intent.
    pub client_secret: String,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub payment_status: PaymentStatus,
    pub order_payment_status: OrderPaymentStatus,
    pub order_status: OrderStatus,

    /// False when the delivery was a duplicate or stale and changed nothing.
    pub applied: bool,
}

/// Payment workflow operations.
#[derive(Clone)]
pub struct PaymentService {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    /// Creates a new PaymentService.
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>) -> Self {
        PaymentService { db, gateway }
    }

    /// Initiates payment for an order.
    ///
    /// ## Preconditions
    /// - the order exists and belongs to the caller (else NotFound)
    /// - `order.payment_status == not_charged` (else AlreadyPaidOrPending)
    ///
    /// Creates the gateway intent for the order's frozen total, stores the
    /// single payment row, and moves the order to Processing. A concurrent
    /// initiate for the same order loses on the payments.order_id unique
    /// constraint and also surfaces AlreadyPaidOrPending.
    pub async fn initiate(
        &self,
        identity: &Identity,
        order_id: &str,
        method: PaymentMethod,
    ) -> EngineResult<InitiatedPayment> {
        let order = self.owned_order(identity, order_id).await?;

        if order.payment_status != OrderPaymentStatus::NotCharged {
            return Err(EngineError::AlreadyPaidOrPending);
        }

        // A terminal order can never move to Processing; refuse before
        // touching the gateway
        if order.status != OrderStatus::Processing
            && !order.status.can_transition_to(OrderStatus::Processing)
        {
            return Err(orderflow_core::CoreError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Processing,
            }
            .into());
        }

        let intent = self
            .gateway
            .create_intent(CreateIntentRequest {
                amount_cents: order.total_cents,
                currency: CURRENCY.to_string(),
                order_id: order.id.clone(),
                user_id: identity.user_id.clone(),
                shipping: Some(ShippingDetails {
                    name: order.shipping_address.name.clone(),
                    street: order.shipping_address.street.clone(),
                    city: order.shipping_address.city.clone(),
                    state: order.shipping_address.state.clone(),
                    zip: order.shipping_address.zip.clone(),
                    country: order.shipping_address.country.clone(),
                }),
            })
            .await?;

        let client_secret = intent.client_secret.clone().ok_or_else(|| {
            EngineError::GatewayUnavailable("intent missing client secret".to_string())
        })?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            user_id: identity.user_id.clone(),
            order_id: order.id.clone(),
            amount_cents: order.total_cents,
            method,
            status: PaymentStatus::Pending,
            transaction_id: Some(intent.id.clone()),
            refund_reason: None,
            created_at: now,
            updated_at: now,
        };

        validation::validate_amount_matches(order.total(), payment.amount())?;

        if let Err(err) = self.db.payments().insert(&payment).await {
            if err.is_unique_violation_on("order_id") {
                return Err(EngineError::AlreadyPaidOrPending);
            }
            return Err(err.into());
        }

        // Pending orders move to Processing now; an order that is already
        // Processing stays put with no duplicate history entry
        if order.status == OrderStatus::Pending {
            self.db
                .orders()
                .record_transition(
                    &order.id,
                    OrderStatus::Pending,
                    OrderStatus::Processing,
                    None,
                )
                .await?;
        }

        info!(
            order_id = %order.id,
            payment_id = %payment.id,
            transaction_id = %intent.id,
            amount = %payment.amount(),
            "Payment initiated"
        );

        Ok(InitiatedPayment {
            payment,
            client_secret,
        })
    }

    /// Reconciles a gateway intent's current outcome into local state.
    ///
    /// ## Checks, in order
    /// 1. the intent exists at the gateway
    /// 2. its recorded owner matches the caller (Forbidden otherwise)
    /// 3. a payment with this transaction id and its order both exist
    /// 4. the gateway amount equals the stored amount (hard failure)
    ///
    /// Then the outcome table in the module docs is applied idempotently.
    pub async fn reconcile(
        &self,
        identity: &Identity,
        intent_id: &str,
    ) -> EngineResult<ReconcileOutcome> {
        let intent = self.gateway.retrieve_intent(intent_id).await?;

        if intent.metadata.user_id != identity.user_id && !identity.is_admin() {
            return Err(EngineError::Forbidden);
        }

        let payment = self
            .db
            .payments()
            .get_by_transaction(intent_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Payment", intent_id))?;

        let order = self
            .db
            .orders()
            .get_by_id(&intent.metadata.order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order", &intent.metadata.order_id))?;

        // Never trust an intent whose amount drifted from what we stored
        validation::validate_amount_matches(
            payment.amount(),
            Money::from_cents(intent.amount_cents),
        )?;

        let (target_payment, target_order_ps) = match intent.status.as_str() {
            STATUS_SUCCEEDED => (PaymentStatus::Completed, OrderPaymentStatus::Charged),
            STATUS_REQUIRES_PAYMENT_METHOD => {
                (PaymentStatus::Failed, OrderPaymentStatus::NotCharged)
            }
            STATUS_PROCESSING => (PaymentStatus::Processing, OrderPaymentStatus::Processing),
            other => return Err(EngineError::UnexpectedGatewayStatus(other.to_string())),
        };

        let mut applied = false;

        if payment.status == target_payment {
            // Duplicate delivery. Still converge the order's mirror in case
            // an earlier pass crashed between the two writes.
            if order.payment_status != target_order_ps {
                self.db
                    .orders()
                    .set_payment_status(&order.id, target_order_ps)
                    .await?;
            }
            debug!(intent_id = %intent_id, status = %intent.status, "Duplicate outcome, no-op");
        } else if payment.status.can_transition_to(target_payment) {
            self.db
                .payments()
                .set_status(&payment.id, target_payment)
                .await?;
            if order.payment_status != target_order_ps {
                self.db
                    .orders()
                    .set_payment_status(&order.id, target_order_ps)
                    .await?;
            }
            applied = true;
        } else {
            // Stale outcome after a more final one; local state stands
            debug!(
                intent_id = %intent_id,
                local = ?payment.status,
                reported = %intent.status,
                "Stale outcome, skipped"
            );
        }

        // A settled charge pulls a still-pending order into Processing;
        // re-delivery finds it there already and appends nothing
        if target_payment == PaymentStatus::Completed && order.status == OrderStatus::Pending {
            self.db
                .orders()
                .record_transition(
                    &order.id,
                    OrderStatus::Pending,
                    OrderStatus::Processing,
                    None,
                )
                .await?;
        }

        let order = self
            .db
            .orders()
            .get_by_id(&order.id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order", &intent.metadata.order_id))?;

        info!(
            intent_id = %intent_id,
            order_id = %order.id,
            gateway_status = %intent.status,
            ?applied,
            "Reconciliation pass complete"
        );

        Ok(ReconcileOutcome {
            payment_status: if applied { target_payment } else { payment.status },
            order_payment_status: order.payment_status,
            order_status: order.status,
            applied,
        })
    }

    /// Refunds a completed payment (admin only).
    ///
    /// A non-empty reason is mandatory; the order's payment status mirrors
    /// the refund. Stock is NOT released - that belongs to cancellation.
    pub async fn refund(
        &self,
        identity: &Identity,
        order_id: &str,
        reason: &str,
    ) -> EngineResult<Payment> {
        if !identity.is_admin() {
            return Err(EngineError::Forbidden);
        }

        validation::validate_refund_reason(PaymentStatus::Refunded, Some(reason))?;

        let payment = self
            .db
            .payments()
            .get_by_order(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Payment", order_id))?;

        if !payment.status.can_transition_to(PaymentStatus::Refunded) {
            return Err(orderflow_core::CoreError::InvalidPaymentTransition {
                from: payment.status,
                to: PaymentStatus::Refunded,
            }
            .into());
        }

        self.db.payments().mark_refunded(&payment.id, reason).await?;
        self.db
            .orders()
            .set_payment_status(order_id, OrderPaymentStatus::Refunded)
            .await?;

        info!(order_id = %order_id, payment_id = %payment.id, "Payment refunded");

        self.db
            .payments()
            .get_by_order(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Payment", order_id))
    }

    /// Loads an order scoped to its owner (admins see everything).
    async fn owned_order(&self, identity: &Identity, order_id: &str) -> EngineResult<Order> {
        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order", order_id))?;

        if order.user_id != identity.user_id && !identity.is_admin() {
            return Err(EngineError::not_found("Order", order_id));
        }

        Ok(order)
    }
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService").finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
