//! # Checkout engine public API
//!
//! The programmatic API for the checkout engine. An API instance is created by supplying a database backend that
//! implements the backend traits required by the API.
//!
//! * [`order_flow_api`] drives cart pricing and the two order-creation paths (cash on delivery and online), plus
//!   the idempotent payment confirmation they both funnel into.
//! * [`reconciler_api`] consumes gateway facts (captures, failures, refund updates), regardless of which channel
//!   delivered them, and merges them into order state.
//!
//! ```rust,ignore
//! use checkout_engine::{OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/store.db", 25).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let quote = api.price_quote(user_id, &cart, None, None).await?;
//! ```

pub mod order_flow_api;
pub mod reconciler_api;
