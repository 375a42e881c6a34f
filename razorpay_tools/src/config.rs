use log::*;
use rpg_common::Secret;

pub const DEFAULT_BASE_URL: &str = "https://api.razorpay.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::default(),
            key_secret: Secret::default(),
            webhook_secret: Secret::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RazorpayConfig {
    pub fn new_from_env_or_default() -> Self {
        let key_id = std::env::var("RPG_RAZORPAY_KEY_ID").unwrap_or_else(|_| {
            warn!("RPG_RAZORPAY_KEY_ID not set, using a (probably useless) default");
            "rzp_test_0000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("RPG_RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("RPG_RAZORPAY_KEY_SECRET not set, using a (probably useless) default");
            "00000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("RPG_RAZORPAY_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("RPG_RAZORPAY_WEBHOOK_SECRET not set, using a (probably useless) default");
            "00000000000000".to_string()
        }));
        let base_url = std::env::var("RPG_RAZORPAY_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("RPG_RAZORPAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self { key_id, key_secret, webhook_secret, base_url, timeout_secs }
    }
}
