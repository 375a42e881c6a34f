//! Webhook handlers for the payment gateway.
//!
//! The gateway signs every delivery with an HMAC over the raw body; the `/gateway` scope is wrapped in
//! [`crate::middleware::HmacMiddlewareFactory`], so a handler here only runs for authentic requests.
//!
//! Responses must stay in the 200 range for anything that is not a transient server fault: the gateway retries
//! non-2xx deliveries and eventually disables endpoints that keep failing. Malformed payloads and events that
//! match no order are therefore acknowledged with a `JsonResponse` body, not an error status.

use actix_web::{web, HttpRequest, HttpResponse};
use checkout_engine::{
    order_objects::EventOutcome,
    traits::{CheckoutDatabase, CheckoutError},
    ReconcilerApi,
};
use log::*;
use razorpay_tools::WebhookEnvelope;

use crate::{
    data_objects::{gateway_event_from_envelope, JsonResponse},
    errors::ServerError,
    route,
};

route!(gateway_webhook => Post "/webhook" impl CheckoutDatabase);
pub async fn gateway_webhook<B: CheckoutDatabase>(
    req: HttpRequest,
    body: web::Json<WebhookEnvelope>,
    api: web::Data<ReconcilerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("📬️ Received webhook request: {}", req.uri());
    let envelope = body.into_inner();
    let result = match gateway_event_from_envelope(&envelope) {
        Err(e) => {
            warn!("📬️ Could not convert {} webhook into an event. {e}", envelope.event);
            JsonResponse::failure(e)
        },
        Ok(None) => {
            debug!("📬️ Ignoring {} event", envelope.event);
            JsonResponse::success(format!("Event {} is not consumed here.", envelope.event))
        },
        Ok(Some(event)) => match api.apply_event(event).await {
            Ok(EventOutcome::Applied { order, .. }) => {
                info!("📬️ {} event applied to order [{}]", envelope.event, order.order_id);
                JsonResponse::success("Event applied.")
            },
            Ok(EventOutcome::NoOp(order)) => {
                debug!("📬️ {} event was already applied to order [{}]", envelope.event, order.order_id);
                JsonResponse::success("Event already applied.")
            },
            Ok(EventOutcome::Ignored) => {
                debug!("📬️ {} event matched no order", envelope.event);
                JsonResponse::success("No matching order.")
            },
            // A database fault is the one case worth a retry from the gateway's side.
            Err(CheckoutError::DatabaseError(e)) => {
                error!("📬️ Could not apply {} event. {e}", envelope.event);
                return Err(ServerError::BackendError(e));
            },
            Err(e) => {
                warn!("📬️ Unexpected error while handling {} event. {e}", envelope.event);
                JsonResponse::failure("Unexpected error handling event.")
            },
        },
    };
    Ok(HttpResponse::Ok().json(result))
}
