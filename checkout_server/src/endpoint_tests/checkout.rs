use actix_web::{http::StatusCode, web, web::ServiceConfig};
use checkout_engine::{
    db_types::{Address, Order, OrderStatusType, PaymentMode, PaymentStatus, RefundStatus},
    events::EventProducers,
    order_objects::{DeliveryQuote, PricedLine},
    OrderFlowApi,
};
use chrono::Utc;
use rpg_common::Money;
use serde_json::json;

use super::helpers::{get_request, post_request};
use crate::{endpoint_tests::mocks::MockCheckoutBackend, routes::{CodCheckoutRoute, PriceQuoteRoute}};

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/health", |cfg| {
        cfg.service(crate::routes::health);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn quote_prices_the_cart() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "user_id": 42,
        "items": [{"variant_id": 1, "quantity": 2}],
        "postal_code": "560001"
    });
    let (status, body) = post_request("/cart/quote", body, configure_quote).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    // 2 x ₹400 + ₹50 delivery
    assert!(body.contains("\"total\":85000"), "unexpected body: {body}");
    assert!(body.contains("\"cod_available\":true"), "unexpected body: {body}");
}

#[actix_web::test]
async fn empty_cart_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let body = json!({"user_id": 42, "address_id": 7, "items": []});
    let (status, body) = post_request("/checkout/cod", body, configure_cod).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("The cart is empty"), "unexpected body: {body}");
}

#[actix_web::test]
async fn cod_checkout_places_the_order() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "user_id": 42,
        "address_id": 7,
        "items": [{"variant_id": 1, "quantity": 2}]
    });
    let (status, body) = post_request("/checkout/cod", body, configure_cod).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ord-"), "unexpected body: {body}");
    assert!(body.contains("\"payment_mode\":\"cod\""), "unexpected body: {body}");
}

#[actix_web::test]
async fn cod_is_refused_when_the_zone_does_not_allow_it() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "user_id": 42,
        "address_id": 7,
        "items": [{"variant_id": 1, "quantity": 2}]
    });
    let (status, body) = post_request("/checkout/cod", body, configure_no_cod).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Cash on delivery is not available"), "unexpected body: {body}");
}

fn expect_catalog(backend: &mut MockCheckoutBackend, cod_available: bool) {
    backend.expect_fetch_address().returning(|address_id, user_id| {
        Ok(Some(Address { id: address_id, user_id, postal_code: "560001".into() }))
    });
    backend.expect_resolve_cart().returning(|lines| {
        let priced = lines
            .iter()
            .map(|l| PricedLine {
                variant_id: l.variant_id,
                product_id: 10,
                quantity: l.quantity,
                unit_price: Money::from(40_000),
                line_total: Money::from(40_000 * l.quantity),
            })
            .collect();
        Ok(priced)
    });
    backend.expect_active_offers().returning(|_| Ok(Vec::new()));
    backend.expect_delivery_quote().returning(move |_| {
        Ok(Some(DeliveryQuote { delivery_charge: Money::from(5_000), cod_available }))
    });
    backend.expect_check_stock().returning(|_| Ok(()));
}

fn configure_quote(cfg: &mut ServiceConfig) {
    let mut backend = MockCheckoutBackend::new();
    expect_catalog(&mut backend, true);
    let api = OrderFlowApi::new(backend, EventProducers::default());
    cfg.service(PriceQuoteRoute::<MockCheckoutBackend>::new()).app_data(web::Data::new(api));
}

fn configure_cod(cfg: &mut ServiceConfig) {
    let mut backend = MockCheckoutBackend::new();
    expect_catalog(&mut backend, true);
    backend.expect_place_cod_order().returning(|order| {
        let placed = Order {
            id: 1,
            order_id: order.order_id.clone(),
            user_id: order.user_id,
            address_id: order.address_id,
            total_amount: order.total_amount,
            status: OrderStatusType::Placed,
            payment_mode: PaymentMode::Cod,
            payment_status: PaymentStatus::Pending,
            transaction_id: None,
            gateway_order_id: None,
            coupon_code: order.coupon_code.clone(),
            refund_id: None,
            refund_amount: None,
            refund_status: RefundStatus::None,
            refund_speed: None,
            refund_initiated_at: None,
            refund_completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        Ok((placed, vec![10]))
    });
    let api = OrderFlowApi::new(backend, EventProducers::default());
    cfg.service(CodCheckoutRoute::<MockCheckoutBackend>::new()).app_data(web::Data::new(api));
}

fn configure_no_cod(cfg: &mut ServiceConfig) {
    let mut backend = MockCheckoutBackend::new();
    expect_catalog(&mut backend, false);
    let api = OrderFlowApi::new(backend, EventProducers::default());
    cfg.service(CodCheckoutRoute::<MockCheckoutBackend>::new()).app_data(web::Data::new(api));
}
