use sqlx::SqliteConnection;

use crate::db_types::CartLine;

/// Removes the purchased lines from the user's stored cart. Lines the user added after checkout began are left
/// alone, so only exact (user, variant) pairs are deleted.
pub async fn clear_cart_lines(
    user_id: i64,
    lines: &[CartLine],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let mut removed = 0;
    for line in lines {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND variant_id = $2")
            .bind(user_id)
            .bind(line.variant_id)
            .execute(&mut *conn)
            .await?;
        removed += result.rows_affected();
    }
    Ok(removed)
}

pub async fn fetch_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartLine>, sqlx::Error> {
    sqlx::query_as("SELECT variant_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY variant_id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

pub async fn upsert_cart_line(
    user_id: i64,
    line: CartLine,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cart_items (user_id, variant_id, quantity) VALUES ($1, $2, $3) ON CONFLICT (user_id, \
         variant_id) DO UPDATE SET quantity = excluded.quantity",
    )
    .bind(user_id)
    .bind(line.variant_id)
    .bind(line.quantity)
    .execute(conn)
    .await?;
    Ok(())
}
