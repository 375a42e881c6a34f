use std::{fmt::Display, str::FromStr};

use checkout_engine::{
    db_types::{CartLine, Order, RefundSpeed},
    order_objects::{
        GatewayEvent,
        PaymentCapture,
        PaymentFailure,
        PriceBreakdown,
        RefundEventKind,
        RefundUpdate,
    },
};
use chrono::{DateTime, Utc};
use razorpay_tools::{PaymentRecord, RefundRecord, WebhookEnvelope};
use rpg_common::Money;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// A cart pricing request. With no postal code the quote carries a zero delivery charge and reports COD as
/// unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub user_id: i64,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: i64,
    pub address_id: i64,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// The client callback after completing an online payment. The signature is the gateway's HMAC over
/// `{gateway_order_id}|{payment_id}`, keyed with the API key secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub order: Order,
    pub breakdown: PriceBreakdown,
}

/// Converts a gateway refund entity into the engine's refund event. The event kind is decided by the caller
/// (webhook event name, or refund status for the poll worker), not inferred here.
pub fn refund_update_from_record(kind: RefundEventKind, record: &RefundRecord) -> RefundUpdate {
    let speed = record
        .speed_processed
        .as_deref()
        .or(record.speed_requested.as_deref())
        .and_then(|s| RefundSpeed::from_str(s).ok());
    let created_at = record.created_at.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    // The gateway does not timestamp the processed transition separately, so the observation time stands in.
    let processed_at = (record.status == "processed").then(Utc::now);
    RefundUpdate {
        kind,
        refund_id: record.id.clone(),
        payment_id: record.payment_id.clone(),
        amount: Money::from(record.amount),
        speed,
        created_at,
        processed_at,
    }
}

/// Maps a webhook envelope onto the engine's event type. Returns `Ok(None)` for event names this server does not
/// consume; those are acknowledged upstream, never errors.
pub fn gateway_event_from_envelope(envelope: &WebhookEnvelope) -> Result<Option<GatewayEvent>, ServerError> {
    let refund_kind = match envelope.event.as_str() {
        "payment.captured" => {
            let payment = payment_entity(envelope)?;
            let gateway_order_id = payment
                .order_id
                .clone()
                .ok_or_else(|| ServerError::InvalidRequestBody("Payment entity has no order id".into()))?;
            let capture = PaymentCapture {
                gateway_order_id,
                payment_id: payment.id.clone(),
                amount: payment.amount(),
            };
            return Ok(Some(GatewayEvent::PaymentCaptured(capture)));
        },
        "payment.failed" => {
            let payment = payment_entity(envelope)?;
            let gateway_order_id = payment
                .order_id
                .clone()
                .ok_or_else(|| ServerError::InvalidRequestBody("Payment entity has no order id".into()))?;
            let failure = PaymentFailure { gateway_order_id, payment_id: payment.id.clone() };
            return Ok(Some(GatewayEvent::PaymentFailed(failure)));
        },
        "refund.created" => RefundEventKind::Created,
        "refund.speed_changed" => RefundEventKind::SpeedChanged,
        "refund.processed" => RefundEventKind::Processed,
        "refund.failed" => RefundEventKind::Failed,
        _ => return Ok(None),
    };
    let refund = envelope
        .payload
        .refund
        .as_ref()
        .map(|r| &r.entity)
        .ok_or_else(|| ServerError::InvalidRequestBody("Webhook envelope has no refund entity".into()))?;
    Ok(Some(GatewayEvent::Refund(refund_update_from_record(refund_kind, refund))))
}

fn payment_entity(envelope: &WebhookEnvelope) -> Result<&PaymentRecord, ServerError> {
    envelope
        .payload
        .payment
        .as_ref()
        .map(|p| &p.entity)
        .ok_or_else(|| ServerError::InvalidRequestBody("Webhook envelope has no payment entity".into()))
}

#[cfg(test)]
mod test {
    use checkout_engine::{
        db_types::RefundSpeed,
        order_objects::{GatewayEvent, RefundEventKind},
    };
    use razorpay_tools::WebhookEnvelope;

    use super::gateway_event_from_envelope;

    fn envelope(json: &str) -> WebhookEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn capture_envelope_becomes_capture_event() {
        let env = envelope(
            r#"{
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": "pay_1", "order_id": "order_1", "amount": 85000, "currency": "INR", "status": "captured"
            }}}
        }"#,
        );
        let event = gateway_event_from_envelope(&env).unwrap().unwrap();
        let GatewayEvent::PaymentCaptured(capture) = event else {
            panic!("expected a capture event");
        };
        assert_eq!(capture.gateway_order_id, "order_1");
        assert_eq!(capture.payment_id, "pay_1");
        assert_eq!(capture.amount.value(), 85000);
    }

    #[test]
    fn capture_without_order_id_is_a_bad_request() {
        let env = envelope(
            r#"{
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": "pay_1", "amount": 85000, "currency": "INR", "status": "captured"
            }}}
        }"#,
        );
        assert!(gateway_event_from_envelope(&env).is_err());
    }

    #[test]
    fn refund_event_names_map_onto_kinds() {
        let body = |event: &str| {
            format!(
                r#"{{
                "event": "{event}",
                "payload": {{"refund": {{"entity": {{
                    "id": "rfnd_1", "payment_id": "pay_1", "amount": 500, "currency": "INR",
                    "status": "processed", "speed_processed": "optimum", "created_at": 1600856650
                }}}}}}
            }}"#
            )
        };
        for (name, kind) in [
            ("refund.created", RefundEventKind::Created),
            ("refund.speed_changed", RefundEventKind::SpeedChanged),
            ("refund.processed", RefundEventKind::Processed),
            ("refund.failed", RefundEventKind::Failed),
        ] {
            let event = gateway_event_from_envelope(&envelope(&body(name))).unwrap().unwrap();
            let GatewayEvent::Refund(update) = event else {
                panic!("expected a refund event for {name}");
            };
            assert_eq!(update.kind, kind);
            assert_eq!(update.refund_id, "rfnd_1");
            assert_eq!(update.speed, Some(RefundSpeed::Optimum));
            assert!(update.created_at.is_some());
            assert!(update.processed_at.is_some());
        }
    }

    #[test]
    fn unknown_events_are_skipped() {
        let env = envelope(r#"{"event": "payment.authorized", "payload": {}}"#);
        assert!(gateway_event_from_envelope(&env).unwrap().is_none());
    }
}
