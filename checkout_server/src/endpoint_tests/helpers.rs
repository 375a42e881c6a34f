use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use checkout_engine::db_types::{
    Order,
    OrderId,
    OrderStatusType,
    PaymentMode,
    PaymentStatus,
    RefundStatus,
};
use chrono::{TimeZone, Utc};
use rpg_common::Money;

pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let req = TestRequest::get().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub async fn post_request(
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::post().uri(path).set_json(&body).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

/// A pending online order as the backend would return it.
pub fn pending_order(total: i64) -> Order {
    Order {
        id: 1,
        order_id: OrderId("ord-test00000001".into()),
        user_id: 42,
        address_id: 7,
        total_amount: Money::from(total),
        status: OrderStatusType::Placed,
        payment_mode: PaymentMode::Online,
        payment_status: PaymentStatus::Pending,
        transaction_id: None,
        gateway_order_id: Some("order_gw1".into()),
        coupon_code: None,
        refund_id: None,
        refund_amount: None,
        refund_status: RefundStatus::None,
        refund_speed: None,
        refund_initiated_at: None,
        refund_completed_at: None,
        created_at: Utc.with_ymd_and_hms(2025, 8, 10, 9, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2025, 8, 10, 9, 30, 0).unwrap(),
    }
}

pub fn paid_order(total: i64, txid: &str) -> Order {
    Order {
        payment_status: PaymentStatus::Paid,
        transaction_id: Some(txid.to_string()),
        ..pending_order(total)
    }
}
