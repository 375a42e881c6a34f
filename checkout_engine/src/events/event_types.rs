use crate::db_types::Order;

/// A new order (COD or online) has been committed to the database.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlacedEvent {
    pub order: Order,
}

impl OrderPlacedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An online order's payment has been confirmed and its stock decremented.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A refund has reached a terminal state on the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRefundedEvent {
    pub order: Order,
}

impl OrderRefundedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Stock levels changed for these products. Subscribers typically invalidate product caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChangedEvent {
    pub product_ids: Vec<i64>,
}

impl StockChangedEvent {
    pub fn new(product_ids: Vec<i64>) -> Self {
        Self { product_ids }
    }
}
