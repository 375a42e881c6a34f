//! Value objects exchanged between the pricing engine, the order flows and the reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rpg_common::Money;

use crate::db_types::{CartLine, NewOrderLine, Offer, Order, RefundSpeed};

//--------------------------------------      PricedLine       -------------------------------------------------------
/// A cart line resolved against the catalog: the variant exists and its discounted unit price is known.
#[derive(Debug, Clone, Serialize)]
pub struct PricedLine {
    pub variant_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price after the variant's own discount. This is the price snapshotted into order lines.
    pub unit_price: Money,
    pub line_total: Money,
}

impl PricedLine {
    pub fn as_new_order_line(&self) -> NewOrderLine {
        NewOrderLine {
            variant_id: self.variant_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price: self.line_total,
        }
    }

    pub fn as_cart_line(&self) -> CartLine {
        CartLine::new(self.variant_id, self.quantity)
    }
}

//--------------------------------------    DeliveryQuote      -------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeliveryQuote {
    pub delivery_charge: Money,
    pub cod_available: bool,
}

impl Default for DeliveryQuote {
    /// The quote for an unserviced postal code: nothing is charged and COD is unavailable.
    fn default() -> Self {
        Self { delivery_charge: Money::zero(), cod_available: false }
    }
}

//--------------------------------------    CouponContext      -------------------------------------------------------
/// A manual coupon together with the caller's usage history, everything the pricing engine needs to validate it.
#[derive(Debug, Clone)]
pub struct CouponContext {
    pub offer: Offer,
    /// Number of orders this user has already placed (any coupon). Used for first-order-only coupons.
    pub prior_orders: i64,
    /// Number of orders this user has already placed with this coupon code.
    pub prior_uses: i64,
}

//--------------------------------------    PriceBreakdown     -------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct AppliedOffer {
    pub code: String,
    pub discount: Money,
}

/// The authoritative charge amount for a cart, with its full decomposition.
///
/// Invariant: `total = max(product_total - offer_discount - discount_amount + delivery_charge, 0)`, and at most
/// one of `offer_discount` (automatic) and `discount_amount` (manual coupon) is non-zero.
#[derive(Debug, Clone, Serialize)]
pub struct PriceBreakdown {
    pub product_total: Money,
    pub delivery_charge: Money,
    /// Discount from the manual coupon, if one was applied.
    pub discount_amount: Money,
    /// Discount from the winning automatic offer, if one was applied.
    pub offer_discount: Money,
    pub applied_offers: Vec<AppliedOffer>,
    pub total: Money,
    pub cod_available: bool,
}

impl PriceBreakdown {
    pub fn discount(&self) -> Money {
        self.discount_amount + self.offer_discount
    }
}

//-------------------------------------- PaymentConfirmation   -------------------------------------------------------
/// Result of an idempotent order confirmation. Whichever of the three channels (verify call, webhook, poll) commits
/// first observes `Confirmed`; every later attempt observes `AlreadyPaid` and must not repeat any side effect.
#[derive(Debug, Clone)]
pub enum PaymentConfirmation {
    Confirmed { order: Order, affected_products: Vec<i64> },
    AlreadyPaid(Order),
}

impl PaymentConfirmation {
    pub fn order(&self) -> &Order {
        match self {
            PaymentConfirmation::Confirmed { order, .. } => order,
            PaymentConfirmation::AlreadyPaid(order) => order,
        }
    }
}

//--------------------------------------    Gateway events     -------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCapture {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentFailure {
    pub gateway_order_id: String,
    pub payment_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundEventKind {
    Created,
    SpeedChanged,
    Processed,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundUpdate {
    pub kind: RefundEventKind,
    pub refund_id: String,
    /// The gateway payment id the refund belongs to. Used in the OR-lookup when the refund id has not been
    /// persisted on the order yet.
    pub payment_id: String,
    pub amount: Money,
    pub speed: Option<RefundSpeed>,
    pub created_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A single fact observed on the gateway, regardless of which channel (webhook push or periodic poll) saw it.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    PaymentCaptured(PaymentCapture),
    PaymentFailed(PaymentFailure),
    Refund(RefundUpdate),
}

/// How the reconciler disposed of an event. `Ignored` is an acknowledgement, not an error: gateway webhook
/// senders disable endpoints that repeatedly fail, so unknown orders are acked and dropped.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Applied { order: Order, affected_products: Vec<i64> },
    NoOp(Box<Order>),
    Ignored,
}
