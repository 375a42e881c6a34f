use actix_web::{http::StatusCode, web, web::ServiceConfig};
use checkout_engine::{
    events::EventProducers,
    order_objects::PaymentConfirmation,
    traits::CheckoutError,
    OrderFlowApi,
    ReconcilerApi,
};
use razorpay_tools::{
    helpers::{hmac_hex, verify_payload},
    PaymentRecord,
    RazorpayConfig,
    RefundRecord,
};
use rpg_common::Secret;
use serde_json::json;

use super::{
    helpers::{paid_order, pending_order, post_request},
    mocks::{MockCheckoutBackend, MockGateway},
};
use crate::routes::VerifyPaymentRoute;

const KEY_SECRET: &str = "test_key_secret";

fn signed_body(gateway_order_id: &str, payment_id: &str) -> serde_json::Value {
    let signature = hmac_hex(KEY_SECRET, verify_payload(gateway_order_id, payment_id).as_bytes());
    json!({
        "gateway_order_id": gateway_order_id,
        "payment_id": payment_id,
        "signature": signature
    })
}

#[actix_web::test]
async fn invalid_signature_is_unauthorized() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "gateway_order_id": "order_gw1",
        "payment_id": "pay_1",
        "signature": "deadbeef"
    });
    let (status, body) = post_request("/payment/verify", body, configure_paid).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("signature"), "unexpected body: {body}");
}

#[actix_web::test]
async fn verifying_a_paid_order_is_a_no_op() {
    let _ = env_logger::try_init().ok();
    let body = signed_body("order_gw1", "pay_1");
    let (status, body) = post_request("/payment/verify", body, configure_paid).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"payment_status\":\"Paid\""), "unexpected body: {body}");
}

#[actix_web::test]
async fn mismatched_capture_is_refunded_and_rejected() {
    let _ = env_logger::try_init().ok();
    let body = signed_body("order_gw1", "pay_1");
    let (status, body) = post_request("/payment/verify", body, configure_mismatch).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("refunded"), "unexpected body: {body}");
}

#[actix_web::test]
async fn stock_conflict_after_capture_is_refunded() {
    let _ = env_logger::try_init().ok();
    let body = signed_body("order_gw1", "pay_1");
    let (status, body) = post_request("/payment/verify", body, configure_stock_conflict).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("sold out"), "unexpected body: {body}");
}

#[actix_web::test]
async fn matching_capture_confirms_the_order() {
    let _ = env_logger::try_init().ok();
    let body = signed_body("order_gw1", "pay_1");
    let (status, body) = post_request("/payment/verify", body, configure_confirm).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"payment_status\":\"Paid\""), "unexpected body: {body}");
}

fn test_config() -> RazorpayConfig {
    RazorpayConfig { key_secret: Secret::new(KEY_SECRET.into()), ..RazorpayConfig::default() }
}

fn refund_record(amount: i64) -> RefundRecord {
    RefundRecord {
        id: "rfnd_1".into(),
        payment_id: "pay_1".into(),
        amount,
        currency: "INR".into(),
        status: "pending".into(),
        speed_requested: Some("normal".into()),
        speed_processed: None,
        created_at: Some(1_723_200_000),
    }
}

fn captured_payment(amount: i64) -> PaymentRecord {
    PaymentRecord {
        id: "pay_1".into(),
        order_id: Some("order_gw1".into()),
        amount,
        currency: "INR".into(),
        status: "captured".into(),
        error_description: None,
    }
}

fn register(cfg: &mut ServiceConfig, flow: MockCheckoutBackend, reconciler: MockCheckoutBackend, gateway: MockGateway) {
    let flow_api = OrderFlowApi::new(flow, EventProducers::default());
    let reconciler_api = ReconcilerApi::new(reconciler, EventProducers::default());
    cfg.service(VerifyPaymentRoute::<MockCheckoutBackend, MockGateway>::new())
        .app_data(web::Data::new(flow_api))
        .app_data(web::Data::new(reconciler_api))
        .app_data(web::Data::new(gateway))
        .app_data(web::Data::new(test_config()));
}

fn configure_paid(cfg: &mut ServiceConfig) {
    let mut flow = MockCheckoutBackend::new();
    flow.expect_fetch_order_by_gateway_id().returning(|_| Ok(Some(paid_order(85_000, "pay_1"))));
    register(cfg, flow, MockCheckoutBackend::new(), MockGateway::new());
}

fn configure_mismatch(cfg: &mut ServiceConfig) {
    let mut flow = MockCheckoutBackend::new();
    flow.expect_fetch_order_by_gateway_id().returning(|_| Ok(Some(pending_order(85_000))));
    let mut reconciler = MockCheckoutBackend::new();
    reconciler.expect_attach_refund().times(1).returning(|_, _, _| Ok(pending_order(85_000)));
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().returning(|_| Ok(captured_payment(90_000)));
    gateway
        .expect_refund_payment()
        .times(1)
        .withf(|_, amount, speed| amount.value() == 90_000 && speed == "normal")
        .returning(|_, _, _| Ok(refund_record(90_000)));
    register(cfg, flow, reconciler, gateway);
}

fn configure_stock_conflict(cfg: &mut ServiceConfig) {
    let mut flow = MockCheckoutBackend::new();
    flow.expect_fetch_order_by_gateway_id().returning(|_| Ok(Some(pending_order(85_000))));
    flow.expect_confirm_order_paid().returning(|_, _| Err(CheckoutError::OutOfStock(3)));
    let mut reconciler = MockCheckoutBackend::new();
    reconciler.expect_attach_refund().times(1).returning(|_, _, _| Ok(pending_order(85_000)));
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().returning(|_| Ok(captured_payment(85_000)));
    gateway
        .expect_refund_payment()
        .times(1)
        .withf(|_, amount, speed| amount.value() == 85_000 && speed == "optimum")
        .returning(|_, _, _| Ok(refund_record(85_000)));
    register(cfg, flow, reconciler, gateway);
}

fn configure_confirm(cfg: &mut ServiceConfig) {
    let mut flow = MockCheckoutBackend::new();
    flow.expect_fetch_order_by_gateway_id().returning(|_| Ok(Some(pending_order(85_000))));
    flow.expect_confirm_order_paid().times(1).returning(|_, txid| {
        Ok(PaymentConfirmation::Confirmed { order: paid_order(85_000, txid), affected_products: vec![10] })
    });
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().returning(|_| Ok(captured_payment(85_000)));
    register(cfg, flow, MockCheckoutBackend::new(), gateway);
}
