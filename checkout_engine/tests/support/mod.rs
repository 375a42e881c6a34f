//! Shared harness for the integration tests: a throwaway SQLite database per test, plus catalog seeding helpers.
use chrono::{Duration, Utc};
use log::*;
use sqlx::SqlitePool;
use tempfile::TempDir;

use checkout_engine::SqliteDatabase;
use rpg_common::Money;

/// A test database that lives in its own temp directory. Dropping the holder deletes the files.
pub struct TestDb {
    pub db: SqliteDatabase,
    _dir: TempDir,
}

pub async fn new_test_db() -> TestDb {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("could not create temp dir");
    let url = format!("sqlite://{}/test_store.db", dir.path().display());
    let db = SqliteDatabase::new_with_url(&url, 25).await.expect("error creating test database");
    debug!("🚀️ Test database ready at {url}");
    TestDb { db, _dir: dir }
}

pub async fn insert_product(pool: &SqlitePool, name: &str) -> i64 {
    let (id,): (i64,) = sqlx::query_as("INSERT INTO products (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
    id
}

pub async fn insert_variant(
    pool: &SqlitePool,
    product_id: i64,
    unit_price: Money,
    discount_percent: i64,
    stock: i64,
) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO variants (product_id, unit_price, discount_percent, stock) VALUES ($1, $2, $3, $4) RETURNING \
         id",
    )
    .bind(product_id)
    .bind(unit_price)
    .bind(discount_percent)
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

pub async fn insert_bundle_component(pool: &SqlitePool, bundle: i64, content: i64, qty_per_bundle: i64) {
    sqlx::query(
        "INSERT INTO bundle_components (bundle_variant_id, content_variant_id, quantity_per_bundle) VALUES ($1, \
         $2, $3)",
    )
    .bind(bundle)
    .bind(content)
    .bind(qty_per_bundle)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_zone(pool: &SqlitePool, postal_code: &str, delivery_charge: Money, cod_available: bool) {
    sqlx::query("INSERT INTO delivery_zones (postal_code, delivery_charge, cod_available) VALUES ($1, $2, $3)")
        .bind(postal_code)
        .bind(delivery_charge)
        .bind(cod_available)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn insert_address(pool: &SqlitePool, user_id: i64, postal_code: &str) -> i64 {
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO addresses (user_id, postal_code) VALUES ($1, $2) RETURNING id")
            .bind(user_id)
            .bind(postal_code)
            .fetch_one(pool)
            .await
            .unwrap();
    id
}

pub async fn insert_flat_coupon(pool: &SqlitePool, code: &str, value: Money) {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO offers (code, kind, value, valid_from, valid_until, is_automatic, usage_limit_per_user) \
         VALUES ($1, 'Flat', $2, $3, $4, 0, 1)",
    )
    .bind(code)
    .bind(value.value())
    .bind(now - Duration::days(1))
    .bind(now + Duration::days(1))
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_cart_line(pool: &SqlitePool, user_id: i64, variant_id: i64, quantity: i64) {
    sqlx::query("INSERT INTO cart_items (user_id, variant_id, quantity) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(variant_id)
        .bind(quantity)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn stock_and_sold(pool: &SqlitePool, variant_id: i64) -> (i64, i64) {
    sqlx::query_as("SELECT stock, sold FROM variants WHERE id = $1").bind(variant_id).fetch_one(pool).await.unwrap()
}

pub async fn cart_line_count(pool: &SqlitePool, user_id: i64) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();
    count
}
