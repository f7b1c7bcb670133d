use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{types::Json, SqliteConnection};
use tiffin_common::Paise;

use crate::{db_types::StagedBooking, settlement::BookingRequest};

/// Stages the booking. Returns `None` if a booking is already staged under `provider_order_id`.
pub async fn insert_staged_booking(
    provider_order_id: &str,
    booking: &BookingRequest,
    quoted_total: Paise,
    created_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<StagedBooking>, sqlx::Error> {
    let staged: Option<StagedBooking> = sqlx::query_as(
        r#"
        INSERT INTO staged_bookings (provider_order_id, booking, quoted_total, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (provider_order_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(provider_order_id)
    .bind(Json(booking))
    .bind(quoted_total)
    .bind(created_at)
    .fetch_optional(conn)
    .await?;
    if staged.is_some() {
        debug!("🗃️ Booking staged for provider order {provider_order_id}");
    }
    Ok(staged)
}

pub async fn fetch_staged_booking(
    provider_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<StagedBooking>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM staged_bookings WHERE provider_order_id = $1")
        .bind(provider_order_id)
        .fetch_optional(conn)
        .await
}

pub async fn delete_staged_booking(provider_order_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM staged_bookings WHERE provider_order_id = $1")
        .bind(provider_order_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn purge_staged_bookings(older_than: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM staged_bookings WHERE created_at < $1").bind(older_than).execute(conn).await?;
    Ok(result.rows_affected())
}
