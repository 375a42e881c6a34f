use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderLine, RefundStatus},
    order_objects::RefundUpdate,
    traits::CheckoutError,
};

/// Inserts a new order and its price snapshot lines using the given connection. This is not atomic on its own.
/// Embed the call inside a transaction and pass `&mut *tx` as the connection argument to get atomicity with the
/// stock decrement and cart clear.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, CheckoutError> {
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                user_id,
                address_id,
                total_amount,
                payment_mode,
                coupon_code,
                gateway_order_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.user_id)
    .bind(order.address_id)
    .bind(order.total_amount)
    .bind(order.payment_mode.to_string())
    .bind(&order.coupon_code)
    .bind(&order.gateway_order_id)
    .fetch_one(&mut *conn)
    .await?;
    for line in &order.lines {
        sqlx::query(
            "INSERT INTO order_lines (order_id, variant_id, quantity, unit_price, total_price) VALUES ($1, $2, \
             $3, $4, $5)",
        )
        .bind(inserted.id)
        .bind(line.variant_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.total_price)
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order [{}] inserted with id {}", inserted.order_id, inserted.id);
    Ok(inserted)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_order_by_gateway_id(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE gateway_order_id = $1")
        .bind(gateway_order_id)
        .fetch_optional(conn)
        .await
}

/// Locates the order a refund event belongs to. A webhook can land before the refund id has been persisted on
/// the order, so the lookup falls back to the payment's transaction id. When both match different orders, the
/// refund-id match wins.
pub async fn fetch_order_by_refund_or_txid(
    refund_id: &str,
    txid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM orders WHERE refund_id = $1 OR transaction_id = $2 ORDER BY CASE WHEN refund_id = $1 THEN \
         0 ELSE 1 END LIMIT 1",
    )
    .bind(refund_id)
    .bind(txid)
    .fetch_optional(conn)
    .await
}

/// The paid transition as a single conditional update. Exactly one of any number of concurrent confirmation
/// attempts gets a row back; the rest see `None` and must treat the order as already paid.
///
/// `Failed` is an accepted source state: a capture may land after a stale failure notification.
pub async fn try_mark_paid(
    order_id: &OrderId,
    txid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_status = 'Paid', transaction_id = $1, updated_at = CURRENT_TIMESTAMP WHERE \
         order_id = $2 AND payment_status IN ('Pending', 'Failed') RETURNING *",
    )
    .bind(txid)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    if order.is_none() {
        trace!("💰️ Paid transition for order [{order_id}] rejected; it is not pending or failed");
    }
    Ok(order)
}

/// Marks a pending order failed. A failure event racing behind a capture finds no pending row and is a no-op.
pub async fn try_mark_failed(
    gateway_order_id: &str,
    txid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE orders SET payment_status = 'Failed', transaction_id = $1, updated_at = CURRENT_TIMESTAMP WHERE \
         gateway_order_id = $2 AND payment_status = 'Pending' RETURNING *",
    )
    .bind(txid)
    .bind(gateway_order_id)
    .fetch_optional(conn)
    .await
}

/// Writes the refund fields a gateway event carries onto the order. Only the fields present in the update are
/// touched; `update_refund_status` decides separately whether the status itself may advance.
pub async fn update_refund_fields(
    id: i64,
    update: &RefundUpdate,
    conn: &mut SqliteConnection,
) -> Result<Order, CheckoutError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    set_clause.push("refund_id = ");
    set_clause.push_bind_unseparated(&update.refund_id);
    set_clause.push("refund_amount = ");
    set_clause.push_bind_unseparated(update.amount);
    if let Some(speed) = update.speed {
        set_clause.push("refund_speed = ");
        set_clause.push_bind_unseparated(speed.to_string());
    }
    if let Some(created_at) = update.created_at {
        set_clause.push("refund_initiated_at = ");
        set_clause.push_bind_unseparated(created_at);
    }
    if let Some(processed_at) = update.processed_at {
        set_clause.push("refund_completed_at = ");
        set_clause.push_bind_unseparated(processed_at);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    let order = builder.build_query_as().fetch_optional(conn).await?.ok_or(CheckoutError::OrderIdNotFound(id))?;
    Ok(order)
}

pub async fn update_refund_status(
    id: i64,
    status: RefundStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, CheckoutError> {
    let order: Option<Order> =
        sqlx::query_as("UPDATE orders SET refund_status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status.to_string())
            .bind(id)
            .fetch_optional(conn)
            .await?;
    order.ok_or(CheckoutError::OrderIdNotFound(id))
}

/// A processed refund closes the payment state machine as well.
pub async fn mark_refunded(id: i64, conn: &mut SqliteConnection) -> Result<Order, CheckoutError> {
    let order: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_status = 'Refunded', updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND \
         payment_status = 'Paid' RETURNING *",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match order {
        Some(order) => Ok(order),
        // Already refunded (or never paid). Return the row as-is so callers can log the state.
        None => {
            let order: Option<Order> =
                sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
            order.ok_or(CheckoutError::OrderIdNotFound(id))
        },
    }
}

/// Orders the reconciliation poll must re-check against the gateway.
pub async fn open_refund_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM orders WHERE refund_status = 'InProgress' OR (refund_status = 'Processed' AND \
         refund_completed_at IS NULL) ORDER BY created_at ASC",
    )
    .fetch_all(conn)
    .await
}

pub async fn fetch_order_lines(order_pk: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY variant_id ASC")
        .bind(order_pk)
        .fetch_all(conn)
        .await
}
