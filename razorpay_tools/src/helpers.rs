//! HMAC-SHA256 signature helpers.
//!
//! Razorpay signs two things with two different secrets: the checkout callback (`order_id|payment_id`, keyed by
//! the API key secret) and webhook deliveries (the raw request body, keyed by the webhook secret). Both
//! signatures are lowercase hex.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_hex(secret: &str, data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex-encoded signature in constant time. Malformed hex fails verification rather than erroring.
pub fn valid_signature(secret: &str, data: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

/// The payload signed on a checkout callback.
pub fn verify_payload(gateway_order_id: &str, payment_id: &str) -> String {
    format!("{gateway_order_id}|{payment_id}")
}
