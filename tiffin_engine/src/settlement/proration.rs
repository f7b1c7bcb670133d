use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tiffin_common::Paise;

use crate::{helpers::CivilClock, settlement::SettlementPolicy};

/// The money split of a cancelled order. In paise, `refund + used_amount + penalty == total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationSettlement {
    pub total: Paise,
    pub days_used: i64,
    pub used_amount: Paise,
    pub penalty: Paise,
    pub refund: Paise,
    pub vendor_share: Paise,
}

/// Counts the service days consumed at the moment of cancellation, in civil dates.
///
/// * Before the start day nothing is used.
/// * On the start day, the day counts once the civil time reaches the cut-off.
/// * After that, every whole day since the start counts, and at least one.
pub fn days_used(starting_date: DateTime<Utc>, now: DateTime<Utc>, clock: &CivilClock, cutoff_minutes: u32) -> i64 {
    let start_day = clock.civil_date(starting_date);
    let cancel_day = clock.civil_date(now);
    days_between(start_day, cancel_day, clock.minutes_since_midnight(now), cutoff_minutes)
}

fn days_between(start_day: NaiveDate, cancel_day: NaiveDate, minutes_now: u32, cutoff_minutes: u32) -> i64 {
    if cancel_day < start_day {
        0
    } else if cancel_day == start_day {
        i64::from(minutes_now >= cutoff_minutes)
    } else {
        (cancel_day - start_day).num_days().max(1)
    }
}

/// Splits an order total into the used portion, the cancellation penalty and the refund.
///
/// Consumption is priced at the vendor's per-day rate. It is capped at the total, and the penalty is capped at what
/// remains, so the three parts always add up to the total.
pub fn settle_cancellation(
    total: Paise,
    price_per_day: Paise,
    meals_per_day: i64,
    quantity: i64,
    days_used: i64,
    policy: &SettlementPolicy,
) -> CancellationSettlement {
    let consumed = price_per_day.saturating_mul(meals_per_day).saturating_mul(days_used).saturating_mul(quantity);
    let used_amount = consumed.min(total).max(Paise::default());
    let penalty = policy.cancellation_penalty(total).min(total - used_amount).max(Paise::default());
    let refund = total - used_amount - penalty;
    let vendor_share = policy.vendor_share(used_amount);
    CancellationSettlement { total, days_used, used_amount, penalty, refund, vendor_share }
}
