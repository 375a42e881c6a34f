use chrono::{DateTime, Utc};

use crate::{
    db_types::{Address, CartLine, Offer, OrderLine},
    order_objects::{CouponContext, DeliveryQuote, PricedLine},
    traits::CheckoutError,
};

/// Read-only catalog and history lookups used by the pricing and checkout flows.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Resolves every cart line against the catalog, returning discounted unit prices.
    /// Any unresolvable variant id is a fatal input error ([`CheckoutError::VariantNotFound`]).
    async fn resolve_cart(&self, lines: &[CartLine]) -> Result<Vec<PricedLine>, CheckoutError>;

    /// All automatic offers whose validity window contains `now`, in evaluation order (ascending id).
    async fn active_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>, CheckoutError>;

    /// Looks up a manual coupon by code together with the user's usage history.
    /// Returns `None` if no offer with that code exists.
    async fn coupon_context(&self, user_id: i64, code: &str) -> Result<Option<CouponContext>, CheckoutError>;

    /// Delivery charge and COD eligibility for a postal code, or `None` for an unserviced code.
    async fn delivery_quote(&self, postal_code: &str) -> Result<Option<DeliveryQuote>, CheckoutError>;

    /// Resolves a delivery address owned by the given user.
    async fn fetch_address(&self, address_id: i64, user_id: i64) -> Result<Option<Address>, CheckoutError>;

    /// Advisory, lock-free stock check run before opening a gateway charge. The authoritative check is the
    /// conditional update inside the confirmation transaction; this exists purely to fail fast.
    async fn check_stock(&self, lines: &[CartLine]) -> Result<(), CheckoutError>;

    /// The persisted price snapshot for an order, keyed by the internal order id.
    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, CheckoutError>;
}
