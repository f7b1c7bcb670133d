use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tiffin_common::Paise;

use crate::{
    db_types::{NewPayout, PayoutStage, SubscriptionModel},
    helpers::CivilClock,
    settlement::{quote::check_months, QuoteError, SettlementPolicy, SubscriptionTerms},
};

/// Service dates of an order, as UTC instants of civil midnights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDates {
    pub starting_date: DateTime<Utc>,
    /// The last service day
    pub ending_date: DateTime<Utc>,
    /// The order is removed from the store at this instant
    pub expire_at: DateTime<Utc>,
}

/// Derives the service dates of a new order.
///
/// Per-day orders use the requested range verbatim and expire a day after the last service day. Per-month orders
/// start today, or tomorrow if booked at or after the morning cut-off, and run for whole 30-day months. Dates that
/// fall outside the representable range are rejected with [`QuoteError::InvalidRange`].
pub fn order_dates(
    terms: &SubscriptionTerms,
    now: DateTime<Utc>,
    clock: &CivilClock,
    policy: &SettlementPolicy,
) -> Result<OrderDates, QuoteError> {
    let out_of_range = || QuoteError::InvalidRange(format!("The service dates of {terms:?} cannot be represented"));
    match terms {
        SubscriptionTerms::PerDay { starting_date, ending_date } => {
            let ending_date = clock.checked_civil_midnight(*ending_date).ok_or_else(out_of_range)?;
            Ok(OrderDates {
                starting_date: clock.checked_civil_midnight(*starting_date).ok_or_else(out_of_range)?,
                ending_date,
                expire_at: ending_date.checked_add_signed(Duration::days(1)).ok_or_else(out_of_range)?,
            })
        },
        SubscriptionTerms::PerMonth { number_of_months } => {
            let mut start_day = clock.civil_date(now);
            if clock.civil_hour(now) >= policy.monthly_start_cutoff_hour {
                start_day = start_day.succ_opt().unwrap_or(start_day);
            }
            check_months(*number_of_months)?;
            let starting_date = clock.checked_civil_midnight(start_day).ok_or_else(out_of_range)?;
            let expire_at = starting_date
                .checked_add_signed(Duration::days(number_of_months * policy.days_per_month))
                .ok_or_else(out_of_range)?;
            Ok(OrderDates { starting_date, ending_date: expire_at - Duration::days(1), expire_at })
        },
    }
}

/// The vendor payout schedule of a new order. The amounts always add up to `total`.
pub fn initial_payouts(model: SubscriptionModel, total: Paise, dates: &OrderDates) -> Vec<NewPayout> {
    match model {
        SubscriptionModel::PerDay => vec![NewPayout::pending(PayoutStage::Full, dates.starting_date, total)],
        SubscriptionModel::PerMonth => {
            let first = Paise::from(total.value() / 2);
            vec![
                NewPayout::pending(PayoutStage::FirstHalf, dates.starting_date, first),
                NewPayout::pending(PayoutStage::Final, dates.expire_at, total - first),
            ]
        },
    }
}

/// The schedule that replaces the original one once an order is cancelled.
pub fn refund_payouts(refund: Paise, now: DateTime<Utc>) -> Vec<NewPayout> {
    vec![NewPayout::pending(PayoutStage::Refunded, now, refund)]
}

/// When a settled order may be deleted.
pub fn deletion_time(
    model: SubscriptionModel,
    ending_date: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &SettlementPolicy,
) -> DateTime<Utc> {
    match model {
        SubscriptionModel::PerDay => now + policy.deletion_delay,
        SubscriptionModel::PerMonth => ending_date + policy.deletion_delay,
    }
}

/// The date by which the vendor expects to be paid, as shown on the payout summary.
pub fn vendor_due_date(model: SubscriptionModel, starting_date: DateTime<Utc>) -> DateTime<Utc> {
    match model {
        SubscriptionModel::PerDay => starting_date,
        SubscriptionModel::PerMonth => starting_date + Duration::days(7),
    }
}

/// Whether an order is still inside its cancellation window, with a note for the guest.
pub fn cancel_window(
    active: bool,
    starting_date: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &SettlementPolicy,
) -> (bool, String) {
    if !active {
        return (false, "This order has already been cancelled.".to_string());
    }
    let allowed = now - starting_date <= policy.cancel_window;
    let note = if allowed {
        format!("You can cancel this order until {}.", (starting_date + policy.cancel_window).format("%Y-%m-%d"))
    } else {
        format!(
            "The {}-day cancellation window has passed. Cancelling now refunds only the unused days.",
            policy.cancel_window.num_days()
        )
    };
    (allowed, note)
}
