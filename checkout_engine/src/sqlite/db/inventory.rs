//! The inventory ledger: atomic, deadlock-avoiding stock decrements over variants and bundles.
//!
//! Stock mutation is a single conditional update per variant (`stock >= qty` guard) rather than a
//! read-then-write, so a concurrent decrement can never push stock negative. If any guard rejects, the whole
//! operation fails with [`CheckoutError::OutOfStock`] and the surrounding transaction must roll back; no partial
//! decrement ever survives.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{BundleComponent, CartLine},
    traits::CheckoutError,
};

/// One pending stock mutation after bundle expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub variant_id: i64,
    pub quantity: i64,
}

/// Expands purchased lines into per-variant decrements: a bundle parent is decremented itself, then every content
/// variant by `quantity_per_bundle * quantity`. The result is aggregated and sorted by variant id ascending.
///
/// The sort is mandatory: two concurrent orders touching the same variants in different mention-order must
/// acquire row locks in the same global order, or they deadlock under row-level locking.
pub async fn expand_decrements(
    lines: &[CartLine],
    conn: &mut SqliteConnection,
) -> Result<Vec<StockDecrement>, CheckoutError> {
    let mut totals: BTreeMap<i64, i64> = BTreeMap::new();
    for line in lines {
        *totals.entry(line.variant_id).or_insert(0) += line.quantity;
        let components: Vec<BundleComponent> =
            sqlx::query_as("SELECT * FROM bundle_components WHERE bundle_variant_id = $1")
                .bind(line.variant_id)
                .fetch_all(&mut *conn)
                .await?;
        for component in components {
            *totals.entry(component.content_variant_id).or_insert(0) +=
                component.quantity_per_bundle * line.quantity;
        }
    }
    Ok(totals.into_iter().map(|(variant_id, quantity)| StockDecrement { variant_id, quantity }).collect())
}

/// Decrements stock for the purchased lines inside the caller's transaction.
/// Returns the distinct product ids touched, for downstream cache invalidation.
pub async fn reduce_stock(lines: &[CartLine], conn: &mut SqliteConnection) -> Result<Vec<i64>, CheckoutError> {
    let decrements = expand_decrements(lines, &mut *conn).await?;
    for dec in &decrements {
        let result = sqlx::query(
            "UPDATE variants SET stock = stock - $1, sold = sold + $1 WHERE id = $2 AND stock >= $1",
        )
        .bind(dec.quantity)
        .bind(dec.variant_id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            trace!("📦️ Conditional update rejected decrement of {} on variant {}", dec.quantity, dec.variant_id);
            return Err(CheckoutError::OutOfStock(dec.variant_id));
        }
    }
    affected_products(&decrements, conn).await
}

/// The symmetric reversal of [`reduce_stock`], used for refund/cancellation restocking.
pub async fn restore_stock(lines: &[CartLine], conn: &mut SqliteConnection) -> Result<Vec<i64>, CheckoutError> {
    let increments = expand_decrements(lines, &mut *conn).await?;
    for inc in &increments {
        let result = sqlx::query(
            "UPDATE variants SET stock = stock + $1, sold = sold - $1 WHERE id = $2 AND sold >= $1",
        )
        .bind(inc.quantity)
        .bind(inc.variant_id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CheckoutError::OutOfStock(inc.variant_id));
        }
    }
    affected_products(&increments, conn).await
}

/// Advisory, read-only stock check. No locks are taken; the authoritative check is the conditional update in
/// [`reduce_stock`]. This exists to fail fast before opening a payment session against the gateway.
pub async fn check_stock(lines: &[CartLine], conn: &mut SqliteConnection) -> Result<(), CheckoutError> {
    let decrements = expand_decrements(lines, conn).await?;
    for dec in &decrements {
        let stock: Option<(i64,)> = sqlx::query_as("SELECT stock FROM variants WHERE id = $1")
            .bind(dec.variant_id)
            .fetch_optional(&mut *conn)
            .await?;
        match stock {
            Some((stock,)) if stock >= dec.quantity => {},
            Some(_) => return Err(CheckoutError::OutOfStock(dec.variant_id)),
            None => return Err(CheckoutError::VariantNotFound(dec.variant_id)),
        }
    }
    Ok(())
}

async fn affected_products(
    decrements: &[StockDecrement],
    conn: &mut SqliteConnection,
) -> Result<Vec<i64>, CheckoutError> {
    let mut products = BTreeSet::new();
    for dec in decrements {
        let (product_id,): (i64,) = sqlx::query_as("SELECT product_id FROM variants WHERE id = $1")
            .bind(dec.variant_id)
            .fetch_one(&mut *conn)
            .await?;
        products.insert(product_id);
    }
    Ok(products.into_iter().collect())
}
