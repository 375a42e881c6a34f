use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{Address, CartLine, NewOrder, Order, OrderId, PaymentMode},
    events::{EventProducers, OrderPaidEvent, OrderPlacedEvent, StockChangedEvent},
    order_objects::{PaymentConfirmation, PriceBreakdown, PricedLine},
    pricing::{price_cart, PricingError},
    traits::{CheckoutDatabase, CheckoutError},
};

/// `OrderFlowApi` is the primary API for cart pricing and order creation, and for the payment confirmations that
/// the verification endpoint and the gateway reconciler both funnel into.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: CheckoutDatabase
{
    /// Prices a cart without touching any state. With no postal code the delivery charge is zero and COD is
    /// reported unavailable; a named coupon that fails validation is an error, never silently dropped.
    pub async fn price_quote(
        &self,
        user_id: i64,
        lines: &[CartLine],
        coupon_code: Option<&str>,
        postal_code: Option<&str>,
    ) -> Result<PriceBreakdown, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let now = Utc::now();
        let priced = self.db.resolve_cart(lines).await?;
        let offers = self.db.active_offers(now).await?;
        let coupon = match coupon_code {
            Some(code) => Some(
                self.db
                    .coupon_context(user_id, code)
                    .await?
                    .ok_or_else(|| PricingError::CouponNotFound(code.to_string()))?,
            ),
            None => None,
        };
        let delivery = match postal_code {
            Some(code) => Some(self.db.delivery_quote(code).await?.unwrap_or_default()),
            None => None,
        };
        let breakdown = price_cart(&priced, &offers, coupon.as_ref(), delivery.as_ref(), now)?;
        Ok(breakdown)
    }

    /// Resolves the delivery address and prices the cart against its postal code. This is the pricing step both
    /// checkout paths share, and the one the server uses to size the gateway charge before an online checkout.
    pub async fn quote_for_address(
        &self,
        user_id: i64,
        address_id: i64,
        lines: &[CartLine],
        coupon_code: Option<&str>,
    ) -> Result<(Address, Vec<PricedLine>, PriceBreakdown), CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let address =
            self.db.fetch_address(address_id, user_id).await?.ok_or(CheckoutError::AddressNotFound(address_id))?;
        let now = Utc::now();
        let priced = self.db.resolve_cart(lines).await?;
        let offers = self.db.active_offers(now).await?;
        let coupon = match coupon_code {
            Some(code) => Some(
                self.db
                    .coupon_context(user_id, code)
                    .await?
                    .ok_or_else(|| PricingError::CouponNotFound(code.to_string()))?,
            ),
            None => None,
        };
        // An unserviced postal code prices as zero delivery with COD unavailable.
        let delivery = self.db.delivery_quote(&address.postal_code).await?.unwrap_or_default();
        let breakdown = price_cart(&priced, &offers, coupon.as_ref(), Some(&delivery), now)?;
        Ok((address, priced, breakdown))
    }

    /// Places a cash-on-delivery order: validation, advisory stock check, pricing, the COD-availability gate, and
    /// then a single transaction that inserts the order, decrements stock and clears the cart. Event hooks fire
    /// only after the transaction commits.
    pub async fn checkout_cod(
        &self,
        user_id: i64,
        address_id: i64,
        lines: &[CartLine],
        coupon_code: Option<&str>,
    ) -> Result<(Order, PriceBreakdown), CheckoutError> {
        let (address, priced, breakdown) = self.quote_for_address(user_id, address_id, lines, coupon_code).await?;
        if !breakdown.cod_available {
            return Err(CheckoutError::CodNotAvailable(address.postal_code));
        }
        self.db.check_stock(lines).await?;
        let order = NewOrder::new(user_id, address_id, breakdown.total, PaymentMode::Cod)
            .with_coupon(coupon_code.map(String::from))
            .with_lines(priced.iter().map(PricedLine::as_new_order_line).collect());
        let (order, affected_products) = self.db.place_cod_order(order).await?;
        info!("🛒️ COD order [{}] placed for user {user_id}. Total: {}", order.order_id, breakdown.total);
        self.call_order_placed_hook(&order).await;
        self.call_stock_changed_hook(affected_products).await;
        Ok((order, breakdown))
    }

    /// Places a pending online order carrying the gateway order id the server opened for the quoted total.
    /// No stock is reserved; the decrement happens at confirmation.
    pub async fn checkout_online(
        &self,
        user_id: i64,
        address_id: i64,
        lines: &[CartLine],
        coupon_code: Option<&str>,
        gateway_order_id: String,
    ) -> Result<(Order, PriceBreakdown), CheckoutError> {
        let (_address, priced, breakdown) = self.quote_for_address(user_id, address_id, lines, coupon_code).await?;
        self.db.check_stock(lines).await?;
        let order = NewOrder::new(user_id, address_id, breakdown.total, PaymentMode::Online)
            .with_coupon(coupon_code.map(String::from))
            .with_gateway_order(gateway_order_id)
            .with_lines(priced.iter().map(PricedLine::as_new_order_line).collect());
        let order = self.db.insert_pending_order(order).await?;
        info!("🛒️ Online order [{}] pending for user {user_id}. Total: {}", order.order_id, breakdown.total);
        self.call_order_placed_hook(&order).await;
        Ok((order, breakdown))
    }

    /// Confirms payment for an order, idempotently. Of any number of concurrent confirmation attempts (verify
    /// call, webhook, poll) exactly one observes [`PaymentConfirmation::Confirmed`]; the paid and stock-changed
    /// hooks fire for that one only, after commit.
    pub async fn confirm_order_paid(
        &self,
        order_id: &OrderId,
        txid: &str,
    ) -> Result<PaymentConfirmation, CheckoutError> {
        let confirmation = self.db.confirm_order_paid(order_id, txid).await?;
        if let PaymentConfirmation::Confirmed { order, affected_products } = &confirmation {
            self.call_order_paid_hook(order).await;
            self.call_stock_changed_hook(affected_products.clone()).await;
        }
        Ok(confirmation)
    }

    pub async fn mark_payment_failed(
        &self,
        gateway_order_id: &str,
        txid: &str,
    ) -> Result<Option<Order>, CheckoutError> {
        self.db.mark_payment_failed(gateway_order_id, txid).await
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, CheckoutError> {
        self.db.fetch_order_by_order_id(order_id).await
    }

    pub async fn fetch_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>, CheckoutError> {
        self.db.fetch_order_by_gateway_id(gateway_order_id).await
    }

    async fn call_order_placed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_placed_producer {
            debug!("🛒️ Notifying order placed hook subscribers");
            emitter.publish_event(OrderPlacedEvent::new(order.clone())).await;
        }
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🛒️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_stock_changed_hook(&self, product_ids: Vec<i64>) {
        if product_ids.is_empty() {
            return;
        }
        for emitter in &self.producers.stock_changed_producer {
            debug!("🛒️ Notifying stock changed hook subscribers");
            emitter.publish_event(StockChangedEvent::new(product_ids.clone())).await;
        }
    }
}
