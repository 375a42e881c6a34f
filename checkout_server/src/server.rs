use std::time::Duration;

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    OrderFlowApi,
    ReconcilerApi,
    SqliteDatabase,
};
use log::*;
use razorpay_tools::RazorpayApi;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    reconcile_worker::start_refund_poll_worker,
    routes::{health, CodCheckoutRoute, OnlineCheckoutRoute, OrderByIdRoute, PriceQuoteRoute, VerifyPaymentRoute},
    webhook_routes::GatewayWebhookRoute,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = RazorpayApi::new(config.razorpay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(25, EventHooks::default());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _poll_worker = start_refund_poll_worker(
        db.clone(),
        gateway.clone(),
        producers.clone(),
        config.refund_poll_interval_secs,
    );
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: RazorpayApi,
    producers: EventProducers,
) -> Result<actix_web::dev::Server, ServerError> {
    let razorpay = config.razorpay.clone();
    let webhook_checks = !config.disable_webhook_signature;
    info!("🚦️ Webhook signature checks are {}", if webhook_checks { "enabled" } else { "DISABLED" });
    let srv = HttpServer::new(move || {
        let flow_api = OrderFlowApi::new(db.clone(), producers.clone());
        let reconciler_api = ReconcilerApi::new(db.clone(), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("rpg::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(reconciler_api))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(razorpay.clone()));
        let webhook_scope = web::scope("/gateway")
            .wrap(HmacMiddlewareFactory::new(
                "X-Razorpay-Signature",
                razorpay.webhook_secret.clone(),
                webhook_checks,
            ))
            .service(GatewayWebhookRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(PriceQuoteRoute::<SqliteDatabase>::new())
            .service(CodCheckoutRoute::<SqliteDatabase>::new())
            .service(OnlineCheckoutRoute::<SqliteDatabase, RazorpayApi>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase, RazorpayApi>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
