use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;
use tiffin_common::Paise;

use crate::{
    db_types::{FullOrder, NewOrder, Order, OrderStatusType, PaymentStatus, SubscriptionModel},
    settlement::CancellationSettlement,
    sqlite::db::payouts,
    traits::{RemovalReason, RemovedOrder},
};

/// Inserts the order unless one with the same payment id exists. Returns the new id, or `None` if nothing was
/// inserted.
///
/// The insert does not read before it writes, so when it runs first in a transaction it also takes the write lock.
pub async fn idempotent_insert(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let id: Option<(i64,)> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                payment_id,
                provider_order_id,
                guest_id,
                vendor_id,
                name,
                phone,
                address,
                subscription_model,
                quantity,
                meal_types,
                starting_date,
                ending_date,
                number_of_months,
                total_amount,
                vendor_share,
                payment_status,
                expire_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (payment_id) DO NOTHING
            RETURNING id;
        "#,
    )
    .bind(&order.payment_id)
    .bind(&order.provider_order_id)
    .bind(order.guest_id)
    .bind(order.vendor_id)
    .bind(&order.name)
    .bind(&order.phone)
    .bind(&order.address)
    .bind(order.subscription_model)
    .bind(order.quantity)
    .bind(&order.meal_types)
    .bind(order.starting_date)
    .bind(order.ending_date)
    .bind(order.number_of_months)
    .bind(order.total_amount)
    .bind(order.vendor_share)
    .bind(order.payment_status)
    .bind(order.expire_at)
    .fetch_optional(conn)
    .await?;
    if let Some((id,)) = id {
        debug!("🗃️ Order #{id} inserted for payment {:?}", order.payment_id);
    }
    Ok(id.map(|(id,)| id))
}

pub async fn set_credit_applied(order_id: i64, amount: Paise, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET credit_applied = $1 WHERE id = $2").bind(amount).bind(order_id).execute(conn).await?;
    Ok(())
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await
}

pub async fn fetch_order_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE payment_id = $1").bind(payment_id).fetch_optional(conn).await
}

pub async fn fetch_orders_for_guest(guest_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE guest_id = $1 ORDER BY id DESC").bind(guest_id).fetch_all(conn).await
}

pub async fn fetch_orders_for_vendor(vendor_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE vendor_id = $1 ORDER BY id DESC").bind(vendor_id).fetch_all(conn).await
}

pub async fn fetch_all_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders ORDER BY vendor_id, id").fetch_all(conn).await
}

/// Loads the payout schedule of each order
pub async fn with_payouts(orders: Vec<Order>, conn: &mut SqliteConnection) -> Result<Vec<FullOrder>, sqlx::Error> {
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        let schedule = payouts::payouts_for_order(order.id, &mut *conn).await?;
        result.push(FullOrder::new(order, schedule));
    }
    Ok(result)
}

pub async fn fetch_full_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<FullOrder>, sqlx::Error> {
    match fetch_order(order_id, &mut *conn).await? {
        Some(order) => {
            let schedule = payouts::payouts_for_order(order_id, conn).await?;
            Ok(Some(FullOrder::new(order, schedule)))
        },
        None => Ok(None),
    }
}

/// The `Active` to `Cancelled` check-and-set. Returns false if the order is not an active order of the guest.
pub async fn mark_cancelled(order_id: i64, guest_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2 AND guest_id = $3 AND status = $4")
        .bind(OrderStatusType::Cancelled)
        .bind(order_id)
        .bind(guest_id)
        .bind(OrderStatusType::Active)
        .execute(conn)
        .await?;
    trace!("🗃️ Cancel check-and-set on order #{order_id}: {} rows", result.rows_affected());
    Ok(result.rows_affected() == 1)
}

pub async fn store_settlement(
    order_id: i64,
    settlement: &CancellationSettlement,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE orders SET days_used = $1, used_amount = $2, refund_amount = $3, vendor_share = $4
        WHERE id = $5
        "#,
    )
    .bind(settlement.days_used)
    .bind(settlement.used_amount)
    .bind(settlement.refund)
    .bind(settlement.vendor_share)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_paid(
    order_id: i64,
    to_be_deleted_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET payment_status = $1, to_be_deleted_at = $2 WHERE id = $3")
        .bind(PaymentStatus::Paid)
        .bind(to_be_deleted_at)
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn has_active_orders_with_vendor(
    guest_id: i64,
    vendor_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE guest_id = $1 AND vendor_id = $2 AND status = $3")
            .bind(guest_id)
            .bind(vendor_id)
            .bind(OrderStatusType::Active)
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}

pub async fn has_active_monthly_order(
    guest_id: i64,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM orders
        WHERE guest_id = $1 AND status = $2 AND subscription_model = $3 AND starting_date <= $4 AND expire_at > $4
        "#,
    )
    .bind(guest_id)
    .bind(OrderStatusType::Active)
    .bind(SubscriptionModel::PerMonth)
    .bind(at)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

/// Deletes every order whose `expire_at` or `to_be_deleted_at` has passed. Payouts go with them.
pub async fn remove_expired(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<RemovedOrder>, sqlx::Error> {
    let rows: Vec<(i64, bool)> = sqlx::query_as(
        r#"
        DELETE FROM orders WHERE expire_at <= $1 OR to_be_deleted_at <= $1
        RETURNING id, (to_be_deleted_at IS NOT NULL AND to_be_deleted_at <= $1) AS settled
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    let removed = rows
        .into_iter()
        .map(|(order_id, settled)| {
            let reason = if settled { RemovalReason::Settled } else { RemovalReason::Expired };
            RemovedOrder { order_id, reason }
        })
        .collect();
    Ok(removed)
}
