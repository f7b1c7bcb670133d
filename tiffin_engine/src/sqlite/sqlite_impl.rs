//! `SqliteDatabase` is a concrete implementation of a settlement engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{SqliteConnection, SqlitePool};
use tiffin_common::Paise;

use super::db::{db_url, meal_selections, new_pool, orders, payouts, staged_bookings, users};
use crate::{
    db_types::{
        FullOrder,
        MealSelection,
        NewMealSelection,
        NewOrder,
        NewUser,
        Payout,
        StagedBooking,
        UserAccount,
        Wallet,
    },
    settlement::{apply_credit, credit::credit_applies, BookingRequest, CreditApplication},
    traits::{
        CancellationResult,
        InsertOrderResult,
        OrderCancellation,
        OrderInsertion,
        OrderManagement,
        ReferralCredit,
        SettlementDatabase,
        SettlementError,
        SweepResult,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn stage_booking(
        &self,
        provider_order_id: &str,
        booking: &BookingRequest,
        quoted_total: Paise,
    ) -> Result<StagedBooking, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        staged_bookings::insert_staged_booking(provider_order_id, booking, quoted_total, Utc::now(), &mut conn)
            .await?
            .ok_or_else(|| SettlementError::StagedBookingExists(provider_order_id.to_string()))
    }

    async fn fetch_staged_booking(&self, provider_order_id: &str) -> Result<Option<StagedBooking>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let booking = staged_bookings::fetch_staged_booking(provider_order_id, &mut conn).await?;
        Ok(booking)
    }

    async fn delete_staged_booking(&self, provider_order_id: &str) -> Result<bool, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = staged_bookings::delete_staged_booking(provider_order_id, &mut conn).await?;
        Ok(deleted)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let id = match orders::idempotent_insert(&order, &mut tx).await? {
            Some(id) => id,
            None => {
                let payment_id = order.payment_id.as_deref().unwrap_or_default();
                debug!("🗃️ An order for payment {payment_id} already exists. Nothing to do.");
                let existing = match orders::fetch_order_by_payment_id(payment_id, &mut tx).await? {
                    Some(order) => orders::fetch_full_order(order.id, &mut tx).await?,
                    None => None,
                };
                tx.rollback().await?;
                let existing = existing
                    .ok_or_else(|| SettlementError::DatabaseError(format!("Order for {payment_id} vanished")))?;
                return Ok(InsertOrderResult::AlreadyExists(existing));
            },
        };
        payouts::insert_payouts(id, &order.payouts, &mut tx).await?;
        let guest =
            users::fetch_user(order.guest_id, &mut tx).await?.ok_or(SettlementError::UserNotFound(order.guest_id))?;
        let vendor = users::fetch_user(order.vendor_id, &mut tx)
            .await?
            .filter(UserAccount::is_vendor)
            .ok_or(SettlementError::VendorNotFound(order.vendor_id))?;

        let credit = if credit_applies(order.subscription_model) {
            spend_credit(&guest, order.total_amount, &mut tx).await?
        } else {
            CreditApplication::none(guest.credit_amount, order.total_amount)
        };
        if credit.credit_used.is_positive() {
            orders::set_credit_applied(id, credit.credit_used, &mut tx).await?;
        }
        let referral = match order.referral_bonus {
            Some(amount) => redeem_referral(&guest, amount, &mut tx).await?,
            None => None,
        };
        users::incr_order_count(order.vendor_id, &mut tx).await?;
        users::add_booked_vendor(order.guest_id, order.vendor_id, &mut tx).await?;
        if let Some(poid) = &order.provider_order_id {
            if staged_bookings::delete_staged_booking(poid, &mut tx).await? {
                trace!("🗃️ Staged booking {poid} consumed by order #{id}");
            }
        }
        let full_order = orders::fetch_full_order(id, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::DatabaseError(format!("Order #{id} vanished during insert")))?;
        tx.commit().await?;
        debug!("🗃️ Order #{id} committed. Total {}, credit used {}", order.total_amount, credit.credit_used);
        Ok(InsertOrderResult::Inserted(OrderInsertion { order: full_order, vendor: vendor.contact(), credit, referral }))
    }

    async fn cancel_order(&self, cancellation: OrderCancellation) -> Result<CancellationResult, SettlementError> {
        let OrderCancellation { order_id, guest_id, vendor_id, settlement, payouts: schedule, birthday_penalty, now } =
            cancellation;
        let mut tx = self.pool.begin().await?;
        if !orders::mark_cancelled(order_id, guest_id, &mut tx).await? {
            let existing = orders::fetch_order(order_id, &mut tx).await?;
            tx.rollback().await?;
            return match existing {
                Some(order) if order.guest_id == guest_id => Err(SettlementError::AlreadyCancelled(order_id)),
                _ => Err(SettlementError::NotFound(order_id)),
            };
        }
        let mut penalty_charged = None;
        if let Some(penalty) = birthday_penalty {
            if users::deduct_birthday_penalty(guest_id, penalty.amount, now, penalty.not_since, &mut tx).await? {
                debug!("💰️ Birthday penalty of {} charged to guest #{guest_id}", penalty.amount);
                penalty_charged = Some(penalty.amount);
            } else {
                trace!("💰️ Birthday penalty for guest #{guest_id} skipped");
            }
        }
        let wallet = users::credit_wallet(guest_id, settlement.refund, &mut tx)
            .await?
            .ok_or(SettlementError::UserNotFound(guest_id))?;
        orders::store_settlement(order_id, &settlement, &mut tx).await?;
        payouts::replace_payouts(order_id, &schedule, &mut tx).await?;
        users::decr_order_count(vendor_id, &mut tx).await?;
        let vendor_released = !orders::has_active_orders_with_vendor(guest_id, vendor_id, &mut tx).await?;
        if vendor_released {
            users::remove_booked_vendor(guest_id, vendor_id, &mut tx).await?;
            meal_selections::delete_for_guest_and_vendor(guest_id, vendor_id, &mut tx).await?;
        }
        meal_selections::delete_for_order(order_id, &mut tx).await?;
        let order = orders::fetch_full_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::DatabaseError(format!("Order #{order_id} vanished during cancellation")))?;
        tx.commit().await?;
        debug!(
            "🗃️ Order #{order_id} cancelled. {} days used, {} refunded, {} penalty",
            settlement.days_used, settlement.refund, settlement.penalty
        );
        Ok(CancellationResult { order, wallet, birthday_penalty: penalty_charged, vendor_released })
    }

    async fn settle_next_payout(
        &self,
        order_id: i64,
        now: DateTime<Utc>,
        to_be_deleted_at: DateTime<Utc>,
    ) -> Result<(FullOrder, Payout), SettlementError> {
        let mut tx = self.pool.begin().await?;
        let payout = match payouts::settle_next(order_id, now, &mut tx).await? {
            Some(payout) => payout,
            None => {
                let exists = orders::fetch_order(order_id, &mut tx).await?.is_some();
                tx.rollback().await?;
                return Err(if exists {
                    SettlementError::NoPendingPayout(order_id)
                } else {
                    SettlementError::NotFound(order_id)
                });
            },
        };
        orders::mark_paid(order_id, to_be_deleted_at, &mut tx).await?;
        let order = orders::fetch_full_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::DatabaseError(format!("Order #{order_id} vanished during settlement")))?;
        tx.commit().await?;
        debug!("🗃️ Payout {} of order #{order_id} marked as paid", payout.stage);
        Ok((order, payout))
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepResult, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let removed = orders::remove_expired(now, &mut conn).await?;
        Ok(SweepResult { removed, staged_bookings_purged: 0 })
    }

    async fn purge_staged_bookings(&self, older_than: DateTime<Utc>) -> Result<u64, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let purged = staged_bookings::purge_staged_bookings(older_than, &mut conn).await?;
        Ok(purged)
    }

    async fn close(&mut self) -> Result<(), SettlementError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Spends the guest's credit on `amount`. Runs after the order insert, so the transaction already holds the write lock
/// and the balance cannot change under us; the compare-and-set is a second line of defence.
async fn spend_credit(
    guest: &UserAccount,
    amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<CreditApplication, SettlementError> {
    let wallet = users::fetch_wallet(guest.id, &mut *conn).await?.ok_or(SettlementError::UserNotFound(guest.id))?;
    let credit = apply_credit(wallet.credit_amount, amount);
    if credit.credit_used.is_zero() {
        return Ok(credit);
    }
    let updated =
        users::compare_and_set_balance(guest.id, wallet.credit_amount, credit.new_balance, credit.consumed_now, conn)
            .await?;
    if !updated {
        return Err(SettlementError::DatabaseError(format!("The wallet of user #{} changed during the order", guest.id)));
    }
    debug!("💰️ {} of credit applied for guest #{}. New balance {}", credit.credit_used, guest.id, credit.new_balance);
    Ok(credit)
}

async fn redeem_referral(
    guest: &UserAccount,
    amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<Option<ReferralCredit>, SettlementError> {
    let code = match guest.referred_by.as_deref() {
        Some(code) if !guest.referral_used => code,
        _ => return Ok(None),
    };
    let referrer = match users::fetch_guest_by_referral_code(code, &mut *conn).await? {
        Some(referrer) if referrer.id != guest.id => referrer,
        _ => {
            warn!("💰️ Guest #{} was referred with code {code}, but no other guest has it", guest.id);
            return Ok(None);
        },
    };
    if !users::mark_referral_used(guest.id, &mut *conn).await? {
        return Ok(None);
    }
    users::credit_wallet(referrer.id, amount, conn).await?;
    debug!("💰️ Referral bonus of {amount} credited to user #{} for referring #{}", referrer.id, guest.id);
    Ok(Some(ReferralCredit { referrer: referrer.contact(), amount }))
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<FullOrder>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_full_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<FullOrder>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        match orders::fetch_order_by_payment_id(payment_id, &mut conn).await? {
            Some(order) => Ok(orders::with_payouts(vec![order], &mut conn).await?.pop()),
            None => Ok(None),
        }
    }

    async fn fetch_orders_for_guest(&self, guest_id: i64) -> Result<Vec<FullOrder>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let list = orders::fetch_orders_for_guest(guest_id, &mut conn).await?;
        Ok(orders::with_payouts(list, &mut conn).await?)
    }

    async fn fetch_orders_for_vendor(&self, vendor_id: i64) -> Result<Vec<FullOrder>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let list = orders::fetch_orders_for_vendor(vendor_id, &mut conn).await?;
        Ok(orders::with_payouts(list, &mut conn).await?)
    }

    async fn fetch_all_orders(&self) -> Result<Vec<FullOrder>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let list = orders::fetch_all_orders(&mut conn).await?;
        Ok(orders::with_payouts(list, &mut conn).await?)
    }

    async fn has_active_monthly_order(&self, guest_id: i64, at: DateTime<Utc>) -> Result<bool, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::has_active_monthly_order(guest_id, at, &mut conn).await?;
        Ok(result)
    }
}

impl WalletManagement for SqliteDatabase {
    async fn create_user(&self, user: NewUser) -> Result<UserAccount, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let account = users::insert_user(user, &mut conn).await?;
        Ok(account)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let account = users::fetch_user(user_id, &mut conn).await?;
        Ok(account)
    }

    async fn fetch_wallet(&self, user_id: i64) -> Result<Option<Wallet>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = users::fetch_wallet(user_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn credit_wallet(&self, user_id: i64, amount: Paise) -> Result<Wallet, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        users::credit_wallet(user_id, amount, &mut conn).await?.ok_or(SettlementError::UserNotFound(user_id))
    }

    async fn grant_birthday_bonus(
        &self,
        user_id: i64,
        amount: Paise,
        now: DateTime<Utc>,
        granted_before: DateTime<Utc>,
    ) -> Result<Option<Wallet>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = users::grant_birthday_bonus(user_id, amount, now, granted_before, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_booked_vendors(&self, guest_id: i64) -> Result<Vec<i64>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let vendors = users::booked_vendors(guest_id, &mut conn).await?;
        Ok(vendors)
    }

    async fn add_meal_selection(&self, selection: NewMealSelection) -> Result<MealSelection, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let selection = meal_selections::insert_meal_selection(selection, &mut conn).await?;
        Ok(selection)
    }

    async fn fetch_meal_selections(&self, guest_id: i64) -> Result<Vec<MealSelection>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let selections = meal_selections::selections_for_guest(guest_id, &mut conn).await?;
        Ok(selections)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
