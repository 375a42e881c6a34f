use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, RefundStatus},
    events::{EventProducers, OrderPaidEvent, OrderRefundedEvent, StockChangedEvent},
    order_objects::{EventOutcome, GatewayEvent, PaymentCapture, PaymentConfirmation, PaymentFailure, RefundUpdate},
    traits::{CheckoutDatabase, CheckoutError},
};

/// `ReconcilerApi` merges facts observed on the payment gateway into order state.
///
/// Events arrive on three channels (the client's verify call, webhooks, and the periodic poll) in any order, with
/// duplicates, and concurrently. Every merge is idempotent and monotonic, so the result converges no matter how
/// the channels interleave. An event that matches no order is acknowledged, not treated as an error: gateway
/// providers disable webhook endpoints that keep failing.
pub struct ReconcilerApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ReconcilerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcilerApi")
    }
}

impl<B> ReconcilerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> ReconcilerApi<B>
where B: CheckoutDatabase
{
    pub async fn apply_event(&self, event: GatewayEvent) -> Result<EventOutcome, CheckoutError> {
        match event {
            GatewayEvent::PaymentCaptured(capture) => self.apply_capture(capture).await,
            GatewayEvent::PaymentFailed(failure) => self.apply_failure(failure).await,
            GatewayEvent::Refund(update) => self.apply_refund(update).await,
        }
    }

    async fn apply_capture(&self, capture: PaymentCapture) -> Result<EventOutcome, CheckoutError> {
        let Some(order) = self.db.fetch_order_by_gateway_id(&capture.gateway_order_id).await? else {
            warn!("🔁️ Capture {} matched no order. Acknowledging and dropping", capture.payment_id);
            return Ok(EventOutcome::Ignored);
        };
        if capture.amount != order.total_amount {
            // The gateway has the money either way; reconcile the order and leave the dispute to the refund flow.
            warn!(
                "🔁️ Capture {} for order [{}] is {} but the order total is {}",
                capture.payment_id, order.order_id, capture.amount, order.total_amount
            );
        }
        match self.db.confirm_order_paid(&order.order_id, &capture.payment_id).await {
            Ok(PaymentConfirmation::Confirmed { order, affected_products }) => {
                info!("🔁️ Capture {} confirmed order [{}]", capture.payment_id, order.order_id);
                self.call_order_paid_hook(&order).await;
                self.call_stock_changed_hook(affected_products.clone()).await;
                Ok(EventOutcome::Applied { order, affected_products })
            },
            Ok(PaymentConfirmation::AlreadyPaid(order)) => {
                debug!("🔁️ Capture {} was already applied to order [{}]", capture.payment_id, order.order_id);
                Ok(EventOutcome::NoOp(Box::new(order)))
            },
            Err(e) => Err(e),
        }
    }

    async fn apply_failure(&self, failure: PaymentFailure) -> Result<EventOutcome, CheckoutError> {
        match self.db.mark_payment_failed(&failure.gateway_order_id, &failure.payment_id).await? {
            Some(order) => {
                info!("🔁️ Payment {} failed; order [{}] marked as failed", failure.payment_id, order.order_id);
                Ok(EventOutcome::Applied { order, affected_products: Vec::new() })
            },
            // No pending order: either unknown, or a capture already won the race. Both are acknowledged.
            None => Ok(EventOutcome::Ignored),
        }
    }

    async fn apply_refund(&self, update: RefundUpdate) -> Result<EventOutcome, CheckoutError> {
        match self.db.apply_refund_update(&update).await? {
            Some(order) => {
                if order.refund_status == RefundStatus::Processed {
                    self.call_order_refunded_hook(&order).await;
                }
                Ok(EventOutcome::Applied { order, affected_products: Vec::new() })
            },
            None => {
                debug!("🔁️ Refund event {} produced no state change", update.refund_id);
                Ok(EventOutcome::Ignored)
            },
        }
    }

    /// Records a refund the server initiated itself (amount mismatch, or a stock conflict discovered after
    /// capture), so later gateway events about it reconcile onto the right order.
    pub async fn attach_refund(
        &self,
        order_id: &OrderId,
        txid: &str,
        update: &RefundUpdate,
    ) -> Result<Order, CheckoutError> {
        self.db.attach_refund(order_id, txid, update).await
    }

    /// The orders the periodic poll should re-query on the gateway.
    pub async fn open_refund_orders(&self) -> Result<Vec<Order>, CheckoutError> {
        self.db.open_refund_orders().await
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔁️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_refunded_hook(&self, order: &Order) {
        for emitter in &self.producers.order_refunded_producer {
            debug!("🔁️ Notifying order refunded hook subscribers");
            emitter.publish_event(OrderRefundedEvent::new(order.clone())).await;
        }
    }

    async fn call_stock_changed_hook(&self, product_ids: Vec<i64>) {
        if product_ids.is_empty() {
            return;
        }
        for emitter in &self.producers.stock_changed_producer {
            debug!("🔁️ Notifying stock changed hook subscribers");
            emitter.publish_event(StockChangedEvent::new(product_ids.clone())).await;
        }
    }
}
