//! Wire objects for the Razorpay REST API and webhook payloads.
//!
//! Amounts are integer paise throughout, exactly as Razorpay sends them. Only the fields the payment gateway
//! consumes are modelled; unknown fields are ignored on deserialization.

use serde::{Deserialize, Serialize};

use rpg_common::Money;

/// An order registered with the gateway ahead of a checkout. Its id is what the client hands to the payment
/// widget, and what captures refer back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
}

impl GatewayOrder {
    pub fn amount(&self) -> Money {
        Money::from(self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    /// One of `created`, `authorized`, `captured`, `refunded`, `failed`.
    pub status: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl PaymentRecord {
    pub fn amount(&self) -> Money {
        Money::from(self.amount)
    }

    pub fn is_captured(&self) -> bool {
        self.status == "captured" || self.status == "refunded"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRecord {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
    pub currency: String,
    /// One of `pending`, `processed`, `failed`.
    pub status: String,
    #[serde(default)]
    pub speed_requested: Option<String>,
    #[serde(default)]
    pub speed_processed: Option<String>,
    /// Unix timestamp, as the gateway sends it.
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl RefundRecord {
    pub fn amount(&self) -> Money {
        Money::from(self.amount)
    }
}

/// The webhook envelope: `{"event": "...", "payload": {"payment": {"entity": {...}}, "refund": {"entity": ...}}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<WebhookEntity<PaymentRecord>>,
    #[serde(default)]
    pub refund: Option<WebhookEntity<RefundRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntity<T> {
    pub entity: T,
}
