//! Server configuration.
//!
//! Everything is read from environment variables, with logged fallbacks so a bare `checkout_server` still starts
//! on a developer machine. The gateway credentials live in [`RazorpayConfig`] and are read by
//! `RazorpayConfig::new_from_env_or_default`.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `RPG_HOST` | `127.0.0.1` |
//! | `RPG_PORT` | `4000` |
//! | `RPG_DATABASE_URL` | `sqlite://data/rpg_store.db` |
//! | `RPG_DISABLE_WEBHOOK_SIGNATURE` | `false` |
//! | `RPG_REFUND_POLL_INTERVAL_SECS` | `300` |

use std::env;

use log::*;
use razorpay_tools::RazorpayConfig;
use rpg_common::helpers::parse_boolean_flag;

const DEFAULT_RPG_HOST: &str = "127.0.0.1";
const DEFAULT_RPG_PORT: u16 = 4000;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/rpg_store.db";
const DEFAULT_REFUND_POLL_INTERVAL_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the HMAC signature on incoming webhook calls is not checked. **DANGER**
    pub disable_webhook_signature: bool,
    /// How often the refund poll worker re-queries the gateway for open refunds.
    pub refund_poll_interval_secs: u64,
    /// Payment gateway credentials and endpoint.
    pub razorpay: RazorpayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPG_HOST.to_string(),
            port: DEFAULT_RPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            disable_webhook_signature: false,
            refund_poll_interval_secs: DEFAULT_REFUND_POLL_INTERVAL_SECS,
            razorpay: RazorpayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RPG_HOST").ok().unwrap_or_else(|| DEFAULT_RPG_HOST.into());
        let port = env::var("RPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for RPG_PORT. {e} Using the default, {DEFAULT_RPG_PORT}, \
                         instead."
                    );
                    DEFAULT_RPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_RPG_PORT);
        let database_url = env::var("RPG_DATABASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ RPG_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}, instead.");
            DEFAULT_DATABASE_URL.into()
        });
        let disable_webhook_signature = parse_boolean_flag(env::var("RPG_DISABLE_WEBHOOK_SIGNATURE").ok(), false);
        if disable_webhook_signature {
            warn!(
                "🪛️ Webhook signature checks are DISABLED. Anyone can post fake payment events to this server. \
                 Never run like this in production."
            );
        }
        let refund_poll_interval_secs = env::var("RPG_REFUND_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REFUND_POLL_INTERVAL_SECS);
        let razorpay = RazorpayConfig::new_from_env_or_default();
        Self { host, port, database_url, disable_webhook_signature, refund_poll_interval_secs, razorpay }
    }
}
