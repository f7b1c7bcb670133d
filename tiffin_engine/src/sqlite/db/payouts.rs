use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewPayout, Payout, PayoutStatus};

/// Appends the payouts to the order's schedule, numbered in the order given.
pub async fn insert_payouts(order_id: i64, payouts: &[NewPayout], conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for (seq, payout) in payouts.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO payouts (order_id, seq, stage, due_date, amount, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order_id)
        .bind(seq as i64)
        .bind(payout.stage)
        .bind(payout.due_date)
        .bind(payout.amount)
        .bind(payout.status)
        .execute(&mut *conn)
        .await?;
    }
    trace!("🗃️ {} payouts scheduled for order #{order_id}", payouts.len());
    Ok(())
}

pub async fn replace_payouts(
    order_id: i64,
    payouts: &[NewPayout],
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM payouts WHERE order_id = $1").bind(order_id).execute(&mut *conn).await?;
    insert_payouts(order_id, payouts, conn).await
}

pub async fn payouts_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE order_id = $1 ORDER BY seq").bind(order_id).fetch_all(conn).await
}

/// Marks the first pending payout of the order as paid. Returns `None` if there is none.
pub async fn settle_next(
    order_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payout>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE payouts SET status = $1, paid_on = $2
        WHERE order_id = $3 AND seq = (
            SELECT MIN(seq) FROM payouts WHERE order_id = $3 AND status = $4
        )
        RETURNING *
        "#,
    )
    .bind(PayoutStatus::Paid)
    .bind(now)
    .bind(order_id)
    .bind(PayoutStatus::Pending)
    .fetch_optional(conn)
    .await
}
