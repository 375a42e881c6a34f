//! Razorpay integration tools.
//!
//! A thin client over the Razorpay REST API covering exactly what the payment gateway needs: creating gateway
//! orders, fetching payments and issuing/fetching refunds, plus the HMAC-SHA256 signature helpers used to verify
//! checkout callbacks and webhook deliveries. Engine-agnostic: this crate knows nothing about local orders.

mod api;
mod config;
mod error;

mod data_objects;
pub mod helpers;

pub use api::{GatewayClient, RazorpayApi};
pub use config::RazorpayConfig;
pub use data_objects::{
    GatewayOrder,
    PaymentRecord,
    RefundRecord,
    WebhookEnvelope,
    WebhookEntity,
    WebhookPayload,
};
pub use error::GatewayError;
