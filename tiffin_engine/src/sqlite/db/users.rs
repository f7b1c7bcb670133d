use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;
use tiffin_common::Paise;

use crate::db_types::{NewUser, UserAccount, UserType, Wallet};

const WALLET_COLUMNS: &str = "id AS user_id, credit_amount, credit_consumed";

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<UserAccount, sqlx::Error> {
    let account: UserAccount = sqlx::query_as(
        r#"
            INSERT INTO users (
                name,
                email,
                phone,
                user_type,
                credit_amount,
                referral_code,
                referred_by,
                dob,
                price_per_day,
                price_per_month_single,
                price_per_month_both
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(user.name)
    .bind(user.email)
    .bind(user.phone)
    .bind(user.user_type)
    .bind(user.credit_amount)
    .bind(user.referral_code)
    .bind(user.referred_by)
    .bind(user.dob)
    .bind(user.pricing.price_per_day)
    .bind(user.pricing.price_per_month_single)
    .bind(user.pricing.price_per_month_both)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ User #{} ({:?}) created", account.id, account.user_type);
    Ok(account)
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await
}

/// Only guests can refer other guests.
pub async fn fetch_guest_by_referral_code(
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE referral_code = $1 AND user_type = $2")
        .bind(code)
        .bind(UserType::Guest)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_wallet(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {WALLET_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

/// Adds `amount` to the wallet. Returns `None` if the user does not exist.
pub async fn credit_wallet(
    user_id: i64,
    amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<Option<Wallet>, sqlx::Error> {
    let wallet: Option<Wallet> = sqlx::query_as(&format!(
        "UPDATE users SET credit_amount = credit_amount + $1 WHERE id = $2 RETURNING {WALLET_COLUMNS}"
    ))
    .bind(amount)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    trace!("💰️ {amount} credited to user #{user_id}");
    Ok(wallet)
}

/// Replaces the wallet balance with `new_balance`, but only if it is still `expected`. Once set, the
/// `credit_consumed` flag stays set. Returns false if the balance changed in the meantime.
pub async fn compare_and_set_balance(
    user_id: i64,
    expected: Paise,
    new_balance: Paise,
    consumed: bool,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users SET credit_amount = $1, credit_consumed = (credit_consumed OR $2)
        WHERE id = $3 AND credit_amount = $4
        "#,
    )
    .bind(new_balance)
    .bind(consumed)
    .bind(user_id)
    .bind(expected)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Deducts the birthday penalty if the balance covers it and it has not been charged since `not_since`.
pub async fn deduct_birthday_penalty(
    user_id: i64,
    amount: Paise,
    now: DateTime<Utc>,
    not_since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users SET credit_amount = credit_amount - $1, birthday_penalty_at = $2
        WHERE id = $3
          AND credit_amount >= $1
          AND (birthday_penalty_at IS NULL OR birthday_penalty_at < $4)
        "#,
    )
    .bind(amount)
    .bind(now)
    .bind(user_id)
    .bind(not_since)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Credits the birthday bonus unless one was granted at or after `granted_before`.
pub async fn grant_birthday_bonus(
    user_id: i64,
    amount: Paise,
    now: DateTime<Utc>,
    granted_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Wallet>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE users SET credit_amount = credit_amount + $1, birthday_bonus_at = $2
        WHERE id = $3 AND (birthday_bonus_at IS NULL OR birthday_bonus_at < $4)
        RETURNING {WALLET_COLUMNS}
        "#
    ))
    .bind(amount)
    .bind(now)
    .bind(user_id)
    .bind(granted_before)
    .fetch_optional(conn)
    .await
}

/// Flags the guest's referral as redeemed. Returns false if it already was.
pub async fn mark_referral_used(user_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET referral_used = TRUE WHERE id = $1 AND referral_used = FALSE")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn incr_order_count(vendor_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET order_count = order_count + 1 WHERE id = $1").bind(vendor_id).execute(conn).await?;
    Ok(())
}

pub async fn decr_order_count(vendor_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET order_count = MAX(order_count - 1, 0) WHERE id = $1")
        .bind(vendor_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn add_booked_vendor(guest_id: i64, vendor_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO guest_booked_vendors (guest_id, vendor_id) VALUES ($1, $2)")
        .bind(guest_id)
        .bind(vendor_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn remove_booked_vendor(
    guest_id: i64,
    vendor_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM guest_booked_vendors WHERE guest_id = $1 AND vendor_id = $2")
        .bind(guest_id)
        .bind(vendor_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn booked_vendors(guest_id: i64, conn: &mut SqliteConnection) -> Result<Vec<i64>, sqlx::Error> {
    let ids: Vec<(i64,)> =
        sqlx::query_as("SELECT vendor_id FROM guest_booked_vendors WHERE guest_id = $1 ORDER BY vendor_id")
            .bind(guest_id)
            .fetch_all(conn)
            .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}
