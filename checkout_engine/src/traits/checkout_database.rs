use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId},
    order_objects::{PaymentConfirmation, RefundUpdate},
    pricing::PricingError,
    traits::CatalogManagement,
};

/// The transactional operations a backend must provide for the order lifecycle and the gateway reconciler.
///
/// Every method that mutates state runs inside a single database transaction; there are no in-process locks.
/// Correctness under concurrent callers is delegated to row-level locking plus conditional updates.
#[allow(async_fn_in_trait)]
pub trait CheckoutDatabase: CatalogManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Places a cash-on-delivery order atomically: inserts the order and its price snapshot, decrements stock
    /// (with bundle expansion), and clears the purchased lines from the user's cart. Rolls back entirely on
    /// [`CheckoutError::OutOfStock`].
    ///
    /// Returns the inserted order and the distinct product ids whose stock changed.
    async fn place_cod_order(&self, order: NewOrder) -> Result<(Order, Vec<i64>), CheckoutError>;

    /// Inserts a pending online order with its price snapshot and the gateway order id attached.
    /// **No stock is reserved**: stock is decremented only on confirmed payment.
    async fn insert_pending_order(&self, order: NewOrder) -> Result<Order, CheckoutError>;

    /// Idempotently confirms payment for an order. The paid transition itself is a conditional update, so of any
    /// number of concurrent callers exactly one observes [`PaymentConfirmation::Confirmed`] (and performs the
    /// stock decrement and cart clear inside the same transaction); all others observe `AlreadyPaid`.
    ///
    /// Fails with [`CheckoutError::OutOfStock`] (rolling back the paid transition) if the conditional stock
    /// update rejects the decrement.
    async fn confirm_order_paid(&self, order_id: &OrderId, txid: &str) -> Result<PaymentConfirmation, CheckoutError>;

    /// Marks a pending order as failed. Returns `None` (no-op) if the order is missing or no longer pending: a
    /// failure notification racing behind a capture must never clobber a successful payment.
    async fn mark_payment_failed(&self, gateway_order_id: &str, txid: &str) -> Result<Option<Order>, CheckoutError>;

    /// Applies a refund event monotonically. The order is located with an OR-lookup
    /// (`refund_id = ? OR transaction_id = ?`) so that a webhook arriving before the verify call has persisted
    /// the refund id still finds its order. Returns `None` if no order matches (event is acknowledged upstream)
    /// or if the transition is not a forward step.
    async fn apply_refund_update(&self, update: &RefundUpdate) -> Result<Option<Order>, CheckoutError>;

    /// Records a refund the server itself initiated (amount mismatch or post-capture stock conflict), attaching
    /// the payment id and refund details to the order so later gateway events can find it.
    async fn attach_refund(&self, order_id: &OrderId, txid: &str, update: &RefundUpdate)
        -> Result<Order, CheckoutError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, CheckoutError>;

    async fn fetch_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>, CheckoutError>;

    /// Orders the periodic poll must re-check against the gateway: refunds in progress, or processed but missing
    /// a completion timestamp.
    async fn open_refund_orders(&self) -> Result<Vec<Order>, CheckoutError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), CheckoutError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Address {0} could not be resolved")]
    AddressNotFound(i64),
    #[error("Variant {0} does not exist")]
    VariantNotFound(i64),
    #[error("Insufficient stock for variant {0}")]
    OutOfStock(i64),
    #[error("Cash on delivery is not available for postal code {0}")]
    CodNotAvailable(String),
    #[error("{0}")]
    Pricing(#[from] PricingError),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("Illegal payment status change. {0}")]
    PaymentStatusConflict(String),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        CheckoutError::DatabaseError(e.to_string())
    }
}
