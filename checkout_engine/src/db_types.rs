use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use rpg_common::Money;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh public order id. The internal integer primary key is never exposed to clients.
    pub fn random() -> Self {
        let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect();
        Self(format!("ord-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------     PaymentMode       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Cash on delivery. The order is confirmed (and stock decremented) immediately at checkout.
    Cod,
    /// Online payment via the gateway. Stock is decremented only once the charge is confirmed.
    Online,
}

impl Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMode::Cod => write!(f, "Cod"),
            PaymentMode::Online => write!(f, "Online"),
        }
    }
}

impl FromStr for PaymentMode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cod" | "cod" => Ok(Self::Cod),
            "Online" | "online" => Ok(Self::Online),
            s => Err(ConversionError(format!("Invalid payment mode: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
/// The payment-side state machine for an order.
///
/// Transitions are monotonic and forward-only, with a single permitted re-entrant edge: `Failed -> Paid`, which
/// covers a capture landing after a stale failure notification, or a retried payment against the same gateway
/// order. `Paid` can only advance to `Refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn can_transition(self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!((self, to), (Pending, Paid) | (Pending, Failed) | (Failed, Paid) | (Paid, Refunded))
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------     RefundStatus      -------------------------------------------------------
/// The refund-side state machine for an order: `None -> InProgress -> Processed | Failed`.
///
/// `Processed` and `Failed` are terminal. A stale `refund.created` event arriving after `refund.processed` must be
/// a no-op, which [`RefundStatus::can_advance`] encodes: an event may only move the status strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RefundStatus {
    None,
    InProgress,
    Processed,
    Failed,
}

impl RefundStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RefundStatus::Processed | RefundStatus::Failed)
    }

    pub fn can_advance(self, to: RefundStatus) -> bool {
        use RefundStatus::*;
        match (self, to) {
            (Processed, _) | (Failed, _) => false,
            (None, InProgress) | (None, Processed) | (None, Failed) => true,
            (InProgress, Processed) | (InProgress, Failed) => true,
            _ => false,
        }
    }
}

impl Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundStatus::None => write!(f, "None"),
            RefundStatus::InProgress => write!(f, "InProgress"),
            RefundStatus::Processed => write!(f, "Processed"),
            RefundStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for RefundStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "InProgress" => Ok(Self::InProgress),
            "Processed" => Ok(Self::Processed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid refund status: {s}"))),
        }
    }
}

//--------------------------------------     RefundSpeed       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundSpeed {
    Normal,
    Optimum,
}

impl Display for RefundSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundSpeed::Normal => write!(f, "Normal"),
            RefundSpeed::Optimum => write!(f, "Optimum"),
        }
    }
}

impl FromStr for RefundSpeed {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "optimum" => Ok(Self::Optimum),
            s => Err(ConversionError(format!("Invalid refund speed: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed. This is the only status the core assigns; fulfilment states live elsewhere.
    Placed,
    /// The order has been cancelled. Orders are never deleted; cancellation is a status value.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Placed => write!(f, "Placed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Placed" => Ok(Self::Placed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------       CartLine        -------------------------------------------------------
/// A single line of a cart as submitted by the client. Ephemeral input; never persisted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub variant_id: i64,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(variant_id: i64, quantity: i64) -> Self {
        Self { variant_id, quantity }
    }
}

//--------------------------------------        Variant        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub unit_price: Money,
    pub discount_percent: i64,
    pub stock: i64,
    pub sold: i64,
}

impl Variant {
    /// The effective unit price after the variant's own discount, rounded down to the nearest paisa.
    pub fn discounted_price(&self) -> Money {
        self.unit_price.percent(100 - self.discount_percent)
    }
}

//--------------------------------------    BundleComponent    -------------------------------------------------------
#[derive(Debug, Clone, Copy, FromRow)]
pub struct BundleComponent {
    pub bundle_variant_id: i64,
    pub content_variant_id: i64,
    pub quantity_per_bundle: i64,
}

//--------------------------------------       OfferKind       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OfferKind {
    /// A fixed amount off the product total. `value` is the amount in paise.
    Flat,
    /// A percentage off the product total, optionally capped at `max_discount`. `value` is the percentage.
    Percent,
    /// Buy X get Y free: zero-prices the cheapest eligible line for the earned free units.
    FreeItem,
}

impl Display for OfferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferKind::Flat => write!(f, "Flat"),
            OfferKind::Percent => write!(f, "Percent"),
            OfferKind::FreeItem => write!(f, "FreeItem"),
        }
    }
}

impl FromStr for OfferKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Flat" => Ok(Self::Flat),
            "Percent" => Ok(Self::Percent),
            "FreeItem" => Ok(Self::FreeItem),
            s => Err(ConversionError(format!("Invalid offer kind: {s}"))),
        }
    }
}

//--------------------------------------         Offer         -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Offer {
    pub id: i64,
    pub code: String,
    pub kind: OfferKind,
    pub value: i64,
    pub max_discount: Option<Money>,
    pub min_order_value: Money,
    pub min_item_count: i64,
    pub buy_quantity: Option<i64>,
    pub free_quantity: Option<i64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_automatic: bool,
    pub first_order_only: bool,
    pub usage_limit_per_user: i64,
}

impl Offer {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_until
    }

    pub fn thresholds_met(&self, product_total: Money, item_count: i64) -> bool {
        product_total >= self.min_order_value && item_count >= self.min_item_count
    }
}

//--------------------------------------        Address        -------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub postal_code: String,
}

//--------------------------------------         Order         -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: i64,
    pub address_id: i64,
    pub total_amount: Money,
    pub status: OrderStatusType,
    pub payment_mode: PaymentMode,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub gateway_order_id: Option<String>,
    pub coupon_code: Option<String>,
    pub refund_id: Option<String>,
    pub refund_amount: Option<Money>,
    pub refund_status: RefundStatus,
    pub refund_speed: Option<RefundSpeed>,
    pub refund_initiated_at: Option<DateTime<Utc>>,
    pub refund_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        matches!(self.payment_status, PaymentStatus::Paid | PaymentStatus::Refunded)
    }
}

//--------------------------------------       OrderLine       -------------------------------------------------------
/// An immutable price snapshot of one purchased line, taken at order-confirmation time.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderLine {
    pub order_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
}

impl OrderLine {
    pub fn as_cart_line(&self) -> CartLine {
        CartLine::new(self.variant_id, self.quantity)
    }
}

//--------------------------------------       NewOrder        -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub variant_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub user_id: i64,
    pub address_id: i64,
    pub total_amount: Money,
    pub payment_mode: PaymentMode,
    pub coupon_code: Option<String>,
    pub gateway_order_id: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn new(user_id: i64, address_id: i64, total_amount: Money, payment_mode: PaymentMode) -> Self {
        Self {
            order_id: OrderId::random(),
            user_id,
            address_id,
            total_amount,
            payment_mode,
            coupon_code: None,
            gateway_order_id: None,
            lines: Vec::new(),
        }
    }

    pub fn with_coupon(mut self, code: Option<String>) -> Self {
        self.coupon_code = code;
        self
    }

    pub fn with_gateway_order(mut self, gateway_order_id: String) -> Self {
        self.gateway_order_id = Some(gateway_order_id);
        self
    }

    pub fn with_lines(mut self, lines: Vec<NewOrderLine>) -> Self {
        self.lines = lines;
        self
    }

    /// The purchased quantities, used for stock decrements and cart clearing.
    pub fn cart_lines(&self) -> Vec<CartLine> {
        self.lines.iter().map(|l| CartLine::new(l.variant_id, l.quantity)).collect()
    }
}
