//! `SqliteDatabase` is a concrete implementation of a checkout engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Every mutating operation runs in a single transaction; correctness under concurrent callers comes from
//! the conditional updates in the low-level db functions, not from in-process locks.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{cart, catalog, db_url, inventory, new_pool, orders};
use crate::{
    db_types::{Address, CartLine, NewOrder, Offer, Order, OrderId, OrderLine, RefundStatus},
    order_objects::{CouponContext, DeliveryQuote, PaymentConfirmation, PricedLine, RefundEventKind, RefundUpdate},
    traits::{CatalogManagement, CheckoutDatabase, CheckoutError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database given by the `RPG_DATABASE_URL` environment variable, running any pending
    /// migrations.
    pub async fn new(max_connections: u32) -> Result<Self, CheckoutError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, CheckoutError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn resolve_cart(&self, lines: &[CartLine]) -> Result<Vec<PricedLine>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        catalog::resolve_cart(lines, &mut conn).await
    }

    async fn active_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::active_offers(now, &mut conn).await?)
    }

    async fn coupon_context(&self, user_id: i64, code: &str) -> Result<Option<CouponContext>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        catalog::coupon_context(user_id, code, &mut conn).await
    }

    async fn delivery_quote(&self, postal_code: &str) -> Result<Option<DeliveryQuote>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::delivery_quote(postal_code, &mut conn).await?)
    }

    async fn fetch_address(&self, address_id: i64, user_id: i64) -> Result<Option<Address>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_address(address_id, user_id, &mut conn).await?)
    }

    async fn check_stock(&self, lines: &[CartLine]) -> Result<(), CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        inventory::check_stock(lines, &mut conn).await
    }

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_lines(order_id, &mut conn).await?)
    }
}

impl CheckoutDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// In a single atomic transaction,
    /// * inserts the order row and its price snapshot lines,
    /// * decrements stock for every purchased line (with bundle expansion),
    /// * removes the purchased lines from the user's cart.
    ///
    /// Any [`CheckoutError::OutOfStock`] rolls the whole order back.
    async fn place_cod_order(&self, order: NewOrder) -> Result<(Order, Vec<i64>), CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let lines = order.cart_lines();
        let user_id = order.user_id;
        let order = orders::insert_order(order, &mut tx).await?;
        let affected_products = inventory::reduce_stock(&lines, &mut tx).await?;
        let removed = cart::clear_cart_lines(user_id, &lines, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ COD order [{}] committed. {removed} cart lines cleared", order.order_id);
        Ok((order, affected_products))
    }

    async fn insert_pending_order(&self, order: NewOrder) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Pending online order [{}] committed. No stock reserved", order.order_id);
        Ok(order)
    }

    /// The paid transition is the first statement of the transaction, so concurrent confirmations serialise on
    /// the write lock: exactly one caller gets the row back and performs the stock decrement and cart clear;
    /// everyone else observes [`PaymentConfirmation::AlreadyPaid`].
    async fn confirm_order_paid(
        &self,
        order_id: &OrderId,
        txid: &str,
    ) -> Result<PaymentConfirmation, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::try_mark_paid(order_id, txid, &mut tx).await? else {
            let order = orders::fetch_order_by_order_id(order_id, &mut tx)
                .await?
                .ok_or_else(|| CheckoutError::OrderNotFound(order_id.clone()))?;
            if !order.is_paid() {
                return Err(CheckoutError::PaymentStatusConflict(format!(
                    "Order [{order_id}] is {} and cannot be confirmed",
                    order.payment_status
                )));
            }
            debug!("💰️ Order [{order_id}] was already paid. Nothing to do");
            return Ok(PaymentConfirmation::AlreadyPaid(order));
        };
        // Decrement stock off the persisted snapshot, never the live cart.
        let lines =
            orders::fetch_order_lines(order.id, &mut tx).await?.iter().map(OrderLine::as_cart_line).collect::<Vec<_>>();
        let affected_products = inventory::reduce_stock(&lines, &mut tx).await?;
        cart::clear_cart_lines(order.user_id, &lines, &mut tx).await?;
        tx.commit().await?;
        info!("💰️ Order [{order_id}] confirmed paid with transaction {txid}");
        Ok(PaymentConfirmation::Confirmed { order, affected_products })
    }

    async fn mark_payment_failed(
        &self,
        gateway_order_id: &str,
        txid: &str,
    ) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::try_mark_failed(gateway_order_id, txid, &mut conn).await?;
        match &order {
            Some(order) => info!("💰️ Order [{}] marked as failed", order.order_id),
            None => debug!("💰️ Failure event for gateway order {gateway_order_id} matched no pending order"),
        }
        Ok(order)
    }

    /// Merges a refund event into the order it belongs to. The merge is monotonic: the refund status only ever
    /// moves forward, so duplicated or out-of-order events collapse into no-ops. `Processed` also closes the
    /// payment state machine (`Paid -> Refunded`) and stamps the completion time.
    async fn apply_refund_update(&self, update: &RefundUpdate) -> Result<Option<Order>, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::fetch_order_by_refund_or_txid(&update.refund_id, &update.payment_id, &mut tx).await?
        else {
            return Ok(None);
        };
        let target = match update.kind {
            RefundEventKind::Created | RefundEventKind::SpeedChanged => RefundStatus::InProgress,
            RefundEventKind::Processed => RefundStatus::Processed,
            RefundEventKind::Failed => RefundStatus::Failed,
        };
        let advances = order.refund_status.can_advance(target);
        let speed_change_in_place =
            update.kind == RefundEventKind::SpeedChanged && order.refund_status == RefundStatus::InProgress;
        if !advances && !speed_change_in_place {
            debug!(
                "🔁️ Refund event {:?} for order [{}] is stale ({} -> {target}). Ignoring",
                update.kind, order.order_id, order.refund_status
            );
            return Ok(None);
        }
        let mut order = orders::update_refund_fields(order.id, update, &mut tx).await?;
        if advances {
            order = orders::update_refund_status(order.id, target, &mut tx).await?;
        }
        if target == RefundStatus::Processed {
            order = orders::mark_refunded(order.id, &mut tx).await?;
        }
        tx.commit().await?;
        info!("🔁️ Refund {} on order [{}] is now {}", update.refund_id, order.order_id, order.refund_status);
        Ok(Some(order))
    }

    /// Records a refund the server itself initiated, before any gateway event about it exists. The transaction
    /// id is attached as well so later webhook or poll events can find the order via the OR-lookup.
    async fn attach_refund(
        &self,
        order_id: &OrderId,
        txid: &str,
        update: &RefundUpdate,
    ) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(order_id.clone()))?;
        sqlx::query("UPDATE orders SET transaction_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(txid)
            .bind(order.id)
            .execute(&mut *tx)
            .await?;
        let mut order = orders::update_refund_fields(order.id, update, &mut tx).await?;
        if order.refund_status.can_advance(RefundStatus::InProgress) {
            order = orders::update_refund_status(order.id, RefundStatus::InProgress, &mut tx).await?;
        }
        tx.commit().await?;
        info!("🔁️ Refund {} attached to order [{order_id}]", update.refund_id);
        Ok(order)
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn fetch_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_gateway_id(gateway_order_id, &mut conn).await?)
    }

    async fn open_refund_orders(&self) -> Result<Vec<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::open_refund_orders(&mut conn).await?)
    }

    async fn close(&mut self) -> Result<(), CheckoutError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Restores stock for an order's persisted lines, reversing the decrement that confirmation made. Used when
    /// a fully refunded order is cancelled and its goods return to the shelf.
    pub async fn restore_stock_for_order(&self, order: &Order) -> Result<Vec<i64>, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let lines =
            orders::fetch_order_lines(order.id, &mut tx).await?.iter().map(OrderLine::as_cart_line).collect::<Vec<_>>();
        let affected = inventory::restore_stock(&lines, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Stock restored for order [{}]", order.order_id);
        Ok(affected)
    }
}
