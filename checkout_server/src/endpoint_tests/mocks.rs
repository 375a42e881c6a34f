use checkout_engine::{
    db_types::{Address, CartLine, NewOrder, Offer, Order, OrderId, OrderLine},
    order_objects::{CouponContext, DeliveryQuote, PaymentConfirmation, PricedLine, RefundUpdate},
    traits::{CatalogManagement, CheckoutDatabase, CheckoutError},
};
use chrono::{DateTime, Utc};
use mockall::mock;
use razorpay_tools::{GatewayClient, GatewayError, GatewayOrder, PaymentRecord, RefundRecord};
use rpg_common::Money;

mock! {
    pub CheckoutBackend {}
    impl CatalogManagement for CheckoutBackend {
        async fn resolve_cart(&self, lines: &[CartLine]) -> Result<Vec<PricedLine>, CheckoutError>;
        async fn active_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>, CheckoutError>;
        async fn coupon_context(&self, user_id: i64, code: &str) -> Result<Option<CouponContext>, CheckoutError>;
        async fn delivery_quote(&self, postal_code: &str) -> Result<Option<DeliveryQuote>, CheckoutError>;
        async fn fetch_address(&self, address_id: i64, user_id: i64) -> Result<Option<Address>, CheckoutError>;
        async fn check_stock(&self, lines: &[CartLine]) -> Result<(), CheckoutError>;
        async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, CheckoutError>;
    }
    impl CheckoutDatabase for CheckoutBackend {
        fn url(&self) -> &str;
        async fn place_cod_order(&self, order: NewOrder) -> Result<(Order, Vec<i64>), CheckoutError>;
        async fn insert_pending_order(&self, order: NewOrder) -> Result<Order, CheckoutError>;
        async fn confirm_order_paid(&self, order_id: &OrderId, txid: &str) -> Result<PaymentConfirmation, CheckoutError>;
        async fn mark_payment_failed(&self, gateway_order_id: &str, txid: &str) -> Result<Option<Order>, CheckoutError>;
        async fn apply_refund_update(&self, update: &RefundUpdate) -> Result<Option<Order>, CheckoutError>;
        async fn attach_refund(&self, order_id: &OrderId, txid: &str, update: &RefundUpdate) -> Result<Order, CheckoutError>;
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, CheckoutError>;
        async fn fetch_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>, CheckoutError>;
        async fn open_refund_orders(&self) -> Result<Vec<Order>, CheckoutError>;
    }
}

mock! {
    pub Gateway {}
    impl GatewayClient for Gateway {
        async fn create_order(&self, amount: Money, receipt: &str) -> Result<GatewayOrder, GatewayError>;
        async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError>;
        async fn refund_payment(&self, payment_id: &str, amount: Money, speed: &str) -> Result<RefundRecord, GatewayError>;
        async fn fetch_refund(&self, refund_id: &str) -> Result<RefundRecord, GatewayError>;
    }
}
