use checkout_engine::{
    events::EventProducers,
    order_objects::{GatewayEvent, RefundEventKind},
    ReconcilerApi,
    SqliteDatabase,
};
use log::*;
use razorpay_tools::{GatewayClient, RazorpayApi};
use tokio::task::JoinHandle;

use crate::data_objects::refund_update_from_record;

/// Starts the refund poll worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Webhooks can be dropped or arrive out of order, so the worker periodically re-reads every refund that has not
/// reached a terminal state from the gateway and feeds the result through the same idempotent reconciler the
/// webhook path uses. Applying the same fact twice is a no-op by construction.
pub fn start_refund_poll_worker(
    db: SqliteDatabase,
    gateway: RazorpayApi,
    producers: EventProducers,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        let api = ReconcilerApi::new(db, producers);
        info!("🕰️ Refund poll worker started. Polling every {interval_secs}s");
        loop {
            timer.tick().await;
            let orders = match api.open_refund_orders().await {
                Ok(orders) => orders,
                Err(e) => {
                    error!("🕰️ Could not fetch open refunds. {e}");
                    continue;
                },
            };
            if orders.is_empty() {
                trace!("🕰️ No open refunds to poll");
                continue;
            }
            debug!("🕰️ Polling the gateway for {} open refunds", orders.len());
            for order in orders {
                let Some(refund_id) = order.refund_id.clone() else {
                    continue;
                };
                match gateway.fetch_refund(&refund_id).await {
                    Ok(record) => {
                        let kind = match record.status.as_str() {
                            "processed" => RefundEventKind::Processed,
                            "failed" => RefundEventKind::Failed,
                            _ => RefundEventKind::Created,
                        };
                        let update = refund_update_from_record(kind, &record);
                        if let Err(e) = api.apply_event(GatewayEvent::Refund(update)).await {
                            error!("🕰️ Could not apply polled refund {refund_id} to order [{}]. {e}", order.order_id);
                        }
                    },
                    Err(e) => {
                        warn!("🕰️ Could not fetch refund {refund_id} from the gateway. {e}");
                    },
                }
            }
        }
    })
}
