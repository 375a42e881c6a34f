use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use checkout_engine::{events::EventProducers, order_objects::PaymentConfirmation, ReconcilerApi};
use razorpay_tools::helpers::hmac_hex;
use rpg_common::Secret;

use super::{
    helpers::{paid_order, pending_order},
    mocks::MockCheckoutBackend,
};
use crate::{middleware::HmacMiddlewareFactory, webhook_routes::GatewayWebhookRoute};

const WEBHOOK_SECRET: &str = "test_webhook_secret";

const CAPTURE_BODY: &str = r#"{
    "event": "payment.captured",
    "payload": {"payment": {"entity": {
        "id": "pay_1", "order_id": "order_gw1", "amount": 85000, "currency": "INR", "status": "captured"
    }}}
}"#;

async fn webhook_request(
    body: &str,
    signature: Option<String>,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post()
        .uri("/gateway/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    if let Some(sig) = signature {
        req = req.insert_header(("X-Razorpay-Signature", sig));
    }
    let req = req.to_request();
    let scope = web::scope("/gateway")
        .wrap(HmacMiddlewareFactory::new("X-Razorpay-Signature", Secret::new(WEBHOOK_SECRET.into()), true))
        .service(GatewayWebhookRoute::<MockCheckoutBackend>::new());
    let app = App::new().configure(configure).service(scope);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

fn sign(body: &str) -> Option<String> {
    Some(hmac_hex(WEBHOOK_SECRET, body.as_bytes()))
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let err = webhook_request(CAPTURE_BODY, None, configure_idle).await.expect_err("Expected error");
    assert_eq!(err, "No HMAC signature found.");
}

#[actix_web::test]
async fn invalid_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let err = webhook_request(CAPTURE_BODY, Some("deadbeef".into()), configure_idle)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "Invalid HMAC signature.");
}

#[actix_web::test]
async fn capture_event_is_applied() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        webhook_request(CAPTURE_BODY, sign(CAPTURE_BODY), configure_capture).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Event applied."), "unexpected body: {body}");
}

#[actix_web::test]
async fn capture_matching_no_order_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        webhook_request(CAPTURE_BODY, sign(CAPTURE_BODY), configure_no_order).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No matching order."), "unexpected body: {body}");
}

#[actix_web::test]
async fn unconsumed_events_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"event": "payment.authorized", "payload": {}}"#;
    let (status, response) = webhook_request(body, sign(body), configure_idle).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("not consumed"), "unexpected body: {response}");
}

fn register(cfg: &mut ServiceConfig, backend: MockCheckoutBackend) {
    let api = ReconcilerApi::new(backend, EventProducers::default());
    cfg.app_data(web::Data::new(api));
}

fn configure_idle(cfg: &mut ServiceConfig) {
    register(cfg, MockCheckoutBackend::new());
}

fn configure_capture(cfg: &mut ServiceConfig) {
    let mut backend = MockCheckoutBackend::new();
    backend.expect_fetch_order_by_gateway_id().returning(|_| Ok(Some(pending_order(85_000))));
    backend.expect_confirm_order_paid().times(1).returning(|_, txid| {
        Ok(PaymentConfirmation::Confirmed { order: paid_order(85_000, txid), affected_products: vec![10] })
    });
    register(cfg, backend);
}

fn configure_no_order(cfg: &mut ServiceConfig) {
    let mut backend = MockCheckoutBackend::new();
    backend.expect_fetch_order_by_gateway_id().returning(|_| Ok(None));
    register(cfg, backend);
}
