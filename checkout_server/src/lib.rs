//! # Retail checkout server
//! This module hosts the HTTP front end for the checkout engine. It is responsible for:
//! Pricing carts and placing COD and online orders.
//! Verifying client payment callbacks against the gateway before confirming an order.
//! Listening for incoming webhook requests from the payment gateway and feeding them to the reconciler.
//! Periodically polling the gateway for refunds that have not reached a terminal state.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/cart/quote`: Prices a cart without touching any state.
//! * `/checkout/cod` and `/checkout/online`: The two order creation paths.
//! * `/payment/verify`: The client callback after an online payment.
//! * `/gateway/webhook`: The webhook route for payment and refund events, guarded by an HMAC signature check.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod reconcile_worker;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
