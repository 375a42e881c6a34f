//! Checkout Engine
//!
//! The core logic for a retail checkout and payment-reconciliation service. The library is gateway-agnostic: it
//! knows how to price carts, place orders and merge payment facts, but it never talks to a payment provider
//! itself.
//!
//! The library is divided into three main sections:
//! 1. Database management ([`mod@sqlite`]). SQLite is the supported backend. You should never need to access the
//!    database directly; use the public API instead. The exception is the data types, which are defined in
//!    [`db_types`] and are public.
//! 2. The public API ([`OrderFlowApi`] and [`ReconcilerApi`]). The order flow API drives pricing and the two
//!    order-creation paths; the reconciler API merges gateway events (captures, failures, refunds) into order
//!    state, idempotently and in any arrival order. Backends implement the traits in [`mod@traits`].
//! 3. The event hooks ([`mod@events`]). A simple pub-sub layer that emits order-placed, order-paid, stock-changed
//!    and order-refunded events after the corresponding transactions commit.

mod api;

pub mod db_types;
pub mod events;
pub mod order_objects;
pub mod pricing;
pub mod sqlite;
pub mod traits;

pub use api::{order_flow_api::OrderFlowApi, reconciler_api::ReconcilerApi};
pub use sqlite::SqliteDatabase;
