use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Address, CartLine, Offer, Variant},
    order_objects::{CouponContext, DeliveryQuote, PricedLine},
    traits::CheckoutError,
};

pub async fn fetch_variant(variant_id: i64, conn: &mut SqliteConnection) -> Result<Option<Variant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM variants WHERE id = $1").bind(variant_id).fetch_optional(conn).await
}

/// Resolves every cart line to its variant and discounted unit price. An unknown variant id is fatal.
pub async fn resolve_cart(lines: &[CartLine], conn: &mut SqliteConnection) -> Result<Vec<PricedLine>, CheckoutError> {
    let mut result = Vec::with_capacity(lines.len());
    for line in lines {
        let variant = fetch_variant(line.variant_id, conn)
            .await?
            .ok_or(CheckoutError::VariantNotFound(line.variant_id))?;
        let unit_price = variant.discounted_price();
        result.push(PricedLine {
            variant_id: variant.id,
            product_id: variant.product_id,
            quantity: line.quantity,
            unit_price,
            line_total: unit_price * line.quantity,
        });
    }
    Ok(result)
}

/// All automatic offers whose validity window contains `now`, ordered by id ascending. The ordering is the
/// documented tie-break for equal-discount offers: first evaluated wins.
pub async fn active_offers(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Offer>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM offers WHERE is_automatic = 1 AND valid_from <= $1 AND valid_until >= $1 ORDER BY id ASC",
    )
    .bind(now)
    .fetch_all(conn)
    .await
}

pub async fn fetch_offer_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM offers WHERE code = $1").bind(code).fetch_optional(conn).await
}

/// How many orders the user has placed in total. Cancelled orders still count as history for
/// first-order-only coupons; failed payments do not.
pub async fn order_count_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1 AND payment_status <> 'Failed'")
            .bind(user_id)
            .fetch_one(conn)
            .await?;
    Ok(count)
}

pub async fn coupon_use_count(user_id: i64, code: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND coupon_code = $2 AND payment_status <> 'Failed'",
    )
    .bind(user_id)
    .bind(code)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Bundles a coupon lookup with the caller's usage history, as the pricing engine wants it.
pub async fn coupon_context(
    user_id: i64,
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<CouponContext>, CheckoutError> {
    let offer = match fetch_offer_by_code(code, conn).await? {
        Some(offer) => offer,
        None => return Ok(None),
    };
    let prior_orders = order_count_for_user(user_id, conn).await?;
    let prior_uses = coupon_use_count(user_id, code, conn).await?;
    Ok(Some(CouponContext { offer, prior_orders, prior_uses }))
}

pub async fn delivery_quote(
    postal_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryQuote>, sqlx::Error> {
    let row: Option<(i64, bool)> =
        sqlx::query_as("SELECT delivery_charge, cod_available FROM delivery_zones WHERE postal_code = $1")
            .bind(postal_code)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(|(charge, cod_available)| DeliveryQuote { delivery_charge: charge.into(), cod_available }))
}

pub async fn fetch_address(
    address_id: i64,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Address>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
}
