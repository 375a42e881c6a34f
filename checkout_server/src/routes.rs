//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database calls, gateway
//! calls) must be expressed as a future so that worker threads keep serving other requests while it is in flight.

use actix_web::{get, web, HttpResponse, Responder};
use checkout_engine::{
    db_types::OrderId,
    order_objects::{PaymentConfirmation, RefundEventKind},
    traits::{CheckoutDatabase, CheckoutError},
    OrderFlowApi,
    ReconcilerApi,
};
use chrono::Utc;
use log::*;
use razorpay_tools::{helpers::verify_payload, GatewayClient, RazorpayConfig};

use crate::{
    data_objects::{refund_update_from_record, CheckoutRequest, OrderResponse, QuoteRequest, VerifyPaymentRequest},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Quote  ----------------------------------------------------
route!(price_quote => Post "/cart/quote" impl CheckoutDatabase);
/// Route handler for the cart quote endpoint.
///
/// Prices a cart without touching any state. The returned breakdown is the authoritative charge amount for the
/// given cart, coupon and postal code; the client never supplies an amount anywhere else in the API.
pub async fn price_quote<B: CheckoutDatabase>(
    body: web::Json<QuoteRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    trace!("💻️ Received quote request for user {}", req.user_id);
    let breakdown =
        api.price_quote(req.user_id, &req.items, req.coupon_code.as_deref(), req.postal_code.as_deref()).await?;
    Ok(HttpResponse::Ok().json(breakdown))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(cod_checkout => Post "/checkout/cod" impl CheckoutDatabase);
/// Route handler for cash-on-delivery checkout.
///
/// The order is priced, gated on COD availability for the delivery postal code, and placed atomically: stock is
/// decremented and the purchased lines leave the cart in the same transaction that creates the order.
pub async fn cod_checkout<B: CheckoutDatabase>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    trace!("💻️ Received COD checkout request for user {}", req.user_id);
    let (order, breakdown) =
        api.checkout_cod(req.user_id, req.address_id, &req.items, req.coupon_code.as_deref()).await?;
    Ok(HttpResponse::Ok().json(OrderResponse { order, breakdown }))
}

route!(online_checkout => Post "/checkout/online" impl CheckoutDatabase, GatewayClient);
/// Route handler for online checkout.
///
/// Registers a gateway order for the server-side quoted total, then records a pending order carrying the gateway
/// order id. No stock is reserved; the decrement happens when the payment is confirmed.
pub async fn online_checkout<B, G>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<G>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutDatabase,
    G: GatewayClient,
{
    let req = body.into_inner();
    trace!("💻️ Received online checkout request for user {}", req.user_id);
    let (_address, _lines, breakdown) =
        api.quote_for_address(req.user_id, req.address_id, &req.items, req.coupon_code.as_deref()).await?;
    let receipt = format!("rcpt-{}-{}", req.user_id, Utc::now().timestamp_millis());
    let gateway_order = gateway.create_order(breakdown.total, &receipt).await?;
    let (order, breakdown) = api
        .checkout_online(req.user_id, req.address_id, &req.items, req.coupon_code.as_deref(), gateway_order.id)
        .await?;
    Ok(HttpResponse::Ok().json(OrderResponse { order, breakdown }))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/order/{order_id}" impl CheckoutDatabase);
pub async fn order_by_id<B: CheckoutDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let order = api.fetch_order(&order_id).await?.ok_or_else(|| ServerError::OrderNotFound(order_id.to_string()))?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Verify  ----------------------------------------------------
route!(verify_payment => Post "/payment/verify" impl CheckoutDatabase, GatewayClient);
/// Route handler for the client payment callback.
///
/// The signature over `{gateway_order_id}|{payment_id}` is checked first; an invalid signature is rejected before
/// any lookup. The capture is then re-read from the gateway rather than trusted from the client, and the captured
/// amount is compared against the persisted order total. A mismatched capture is refunded in full and the call
/// rejected; a matching capture confirms the order idempotently, and a stock conflict discovered at confirmation
/// time also refunds the capture.
pub async fn verify_payment<B, G>(
    body: web::Json<VerifyPaymentRequest>,
    api: web::Data<OrderFlowApi<B>>,
    reconciler: web::Data<ReconcilerApi<B>>,
    gateway: web::Data<G>,
    config: web::Data<RazorpayConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutDatabase,
    G: GatewayClient,
{
    let req = body.into_inner();
    trace!("💻️ Received payment verification for gateway order {}", req.gateway_order_id);
    let payload = verify_payload(&req.gateway_order_id, &req.payment_id);
    if !razorpay_tools::helpers::valid_signature(config.key_secret.reveal(), payload.as_bytes(), &req.signature) {
        warn!("💻️ Invalid payment signature for gateway order {}", req.gateway_order_id);
        return Err(ServerError::InvalidSignature);
    }
    let order = api
        .fetch_order_by_gateway_id(&req.gateway_order_id)
        .await?
        .ok_or_else(|| ServerError::OrderNotFound(req.gateway_order_id.clone()))?;
    if order.is_paid() {
        debug!("💻️ Order [{}] is already paid. Verification is a no-op", order.order_id);
        return Ok(HttpResponse::Ok().json(order));
    }
    let payment = gateway.fetch_payment(&req.payment_id).await?;
    if !payment.is_captured() {
        if payment.status == "failed" {
            let _ = api.mark_payment_failed(&req.gateway_order_id, &req.payment_id).await?;
        }
        return Err(ServerError::PaymentNotCaptured(req.payment_id, payment.status));
    }
    if payment.amount() != order.total_amount {
        warn!(
            "💻️ Captured amount {} does not match order [{}] total {}. Refunding.",
            payment.amount(),
            order.order_id,
            order.total_amount
        );
        let refund = gateway.refund_payment(&req.payment_id, payment.amount(), "normal").await?;
        let update = refund_update_from_record(RefundEventKind::Created, &refund);
        reconciler.attach_refund(&order.order_id, &req.payment_id, &update).await?;
        return Err(ServerError::PaymentRefunded(format!(
            "Captured amount {} does not match the order total {}",
            payment.amount(),
            order.total_amount
        )));
    }
    match api.confirm_order_paid(&order.order_id, &req.payment_id).await {
        Ok(PaymentConfirmation::Confirmed { order, .. }) => {
            info!("💻️ Payment {} verified. Order [{}] confirmed", req.payment_id, order.order_id);
            Ok(HttpResponse::Ok().json(order))
        },
        Ok(PaymentConfirmation::AlreadyPaid(order)) => Ok(HttpResponse::Ok().json(order)),
        Err(CheckoutError::OutOfStock(variant_id)) => {
            warn!(
                "💻️ Order [{}] was paid but variant {variant_id} sold out first. Refunding payment {}",
                order.order_id, req.payment_id
            );
            let refund = gateway.refund_payment(&req.payment_id, payment.amount(), "optimum").await?;
            let update = refund_update_from_record(RefundEventKind::Created, &refund);
            reconciler.attach_refund(&order.order_id, &req.payment_id, &update).await?;
            Err(ServerError::PaymentRefunded(format!(
                "An item in order {} sold out before the payment was confirmed",
                order.order_id
            )))
        },
        Err(e) => Err(e.into()),
    }
}
