use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{MealSelection, NewMealSelection};

pub async fn insert_meal_selection(
    selection: NewMealSelection,
    conn: &mut SqliteConnection,
) -> Result<MealSelection, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO meal_selections (guest_id, vendor_id, order_id, meal_date, meal_type)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(selection.guest_id)
    .bind(selection.vendor_id)
    .bind(selection.order_id)
    .bind(selection.meal_date)
    .bind(selection.meal_type.to_string())
    .fetch_one(conn)
    .await
}

pub async fn selections_for_guest(guest_id: i64, conn: &mut SqliteConnection) -> Result<Vec<MealSelection>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM meal_selections WHERE guest_id = $1 ORDER BY meal_date, id")
        .bind(guest_id)
        .fetch_all(conn)
        .await
}

pub async fn delete_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM meal_selections WHERE order_id = $1").bind(order_id).execute(conn).await?;
    trace!("🗃️ {} meal selections removed for order #{order_id}", result.rows_affected());
    Ok(result.rows_affected())
}

pub async fn delete_for_guest_and_vendor(
    guest_id: i64,
    vendor_id: i64,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM meal_selections WHERE guest_id = $1 AND vendor_id = $2")
        .bind(guest_id)
        .bind(vendor_id)
        .execute(conn)
        .await?;
    trace!("🗃️ {} meal selections removed for guest #{guest_id} at vendor #{vendor_id}", result.rows_affected());
    Ok(result.rows_affected())
}
