use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tiffin_common::Paise;

use crate::db_types::SubscriptionModel;

/// The outcome of spending wallet credit against an order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditApplication {
    pub balance_before: Paise,
    /// Credit taken from the wallet
    pub credit_used: Paise,
    /// What is left for the payment provider to collect
    pub charged: Paise,
    pub new_balance: Paise,
    /// True if this spend exhausted the wallet
    pub consumed_now: bool,
}

impl CreditApplication {
    /// No credit is spent; the whole amount is charged.
    pub fn none(balance: Paise, amount: Paise) -> Self {
        Self { balance_before: balance, credit_used: Paise::default(), charged: amount, new_balance: balance, consumed_now: false }
    }
}

/// Only monthly subscriptions can be paid for with wallet credit.
pub fn credit_applies(model: SubscriptionModel) -> bool {
    model == SubscriptionModel::PerMonth
}

/// Spends as much of `balance` as possible on `amount`.
pub fn apply_credit(balance: Paise, amount: Paise) -> CreditApplication {
    if !balance.is_positive() || !amount.is_positive() {
        return CreditApplication::none(balance, amount);
    }
    if balance >= amount {
        let new_balance = balance - amount;
        CreditApplication {
            balance_before: balance,
            credit_used: amount,
            charged: Paise::default(),
            new_balance,
            consumed_now: new_balance.is_zero(),
        }
    } else {
        CreditApplication {
            balance_before: balance,
            credit_used: balance,
            charged: amount - balance,
            new_balance: Paise::default(),
            consumed_now: true,
        }
    }
}

pub fn is_birthday(dob: NaiveDate, today: NaiveDate) -> bool {
    dob.month() == today.month() && dob.day() == today.day()
}

/// A birthday bonus may be granted on the birthday itself, once per civil year. `last_granted` is the civil date of
/// the previous grant.
pub fn birthday_bonus_due(dob: NaiveDate, today: NaiveDate, last_granted: Option<NaiveDate>) -> bool {
    is_birthday(dob, today) && last_granted.map_or(true, |day| day.year() < today.year())
}

/// Cancelling in the birth month, on or after the birth day, attracts a penalty.
/// Whether it was already charged this month is checked by the caller against the stored timestamp.
pub fn birthday_penalty_due(dob: NaiveDate, today: NaiveDate) -> bool {
    dob.month() == today.month() && today.day() >= dob.day()
}

pub fn first_of_month(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

pub fn first_of_year(today: NaiveDate) -> NaiveDate {
    today.with_ordinal(1).unwrap_or(today)
}

#[cfg(test)]
mod test {
    use super::*;

    fn p(rupees: i64) -> Paise {
        Paise::from_rupees(rupees)
    }

    #[test]
    fn partial_credit() {
        let app = apply_credit(p(100), p(150));
        assert_eq!(app.charged, p(50));
        assert_eq!(app.new_balance, p(0));
        assert_eq!(app.credit_used, p(100));
        assert!(app.consumed_now);
    }

    #[test]
    fn credit_covers_the_total() {
        let app = apply_credit(p(500), p(150));
        assert_eq!(app.charged, p(0));
        assert_eq!(app.new_balance, p(350));
        assert!(!app.consumed_now);
        let exact = apply_credit(p(150), p(150));
        assert_eq!(exact.new_balance, p(0));
        assert!(exact.consumed_now);
    }

    #[test]
    fn empty_wallet_is_a_no_op() {
        let app = apply_credit(p(0), p(150));
        assert_eq!(app, CreditApplication::none(p(0), p(150)));
        assert!(!app.consumed_now);
    }

    #[test]
    fn only_monthly_orders_use_credit() {
        assert!(credit_applies(SubscriptionModel::PerMonth));
        assert!(!credit_applies(SubscriptionModel::PerDay));
    }

    #[test]
    fn birthday_bonus_gate() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        let dob = d(1990, 8, 15);
        let today = d(2024, 8, 15);
        assert!(birthday_bonus_due(dob, today, None));
        assert!(birthday_bonus_due(dob, today, Some(d(2023, 8, 15))));
        assert!(!birthday_bonus_due(dob, today, Some(today)));
        assert!(!birthday_bonus_due(dob, d(2024, 8, 16), None));
        assert_eq!(first_of_year(today), d(2024, 1, 1));
    }

    #[test]
    fn birthday_bonus_follows_the_calendar_year() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        // 2024 is a leap year, so the two birthdays are 366 days apart
        let dob = d(1990, 3, 1);
        assert!(birthday_bonus_due(dob, d(2025, 3, 1), Some(d(2024, 3, 1))));
        // A grant late on last year's birthday does not block an early one this year
        let dob = d(1990, 12, 31);
        assert!(birthday_bonus_due(dob, d(2025, 12, 31), Some(d(2024, 12, 31))));
    }

    #[test]
    fn birthday_penalty_window() {
        let dob = NaiveDate::from_ymd_opt(1990, 8, 15).unwrap();
        assert!(!birthday_penalty_due(dob, NaiveDate::from_ymd_opt(2024, 8, 14).unwrap()));
        assert!(birthday_penalty_due(dob, NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()));
        assert!(birthday_penalty_due(dob, NaiveDate::from_ymd_opt(2024, 8, 31).unwrap()));
        assert!(!birthday_penalty_due(dob, NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()));
        assert_eq!(first_of_month(NaiveDate::from_ymd_opt(2024, 8, 31).unwrap()), NaiveDate::from_ymd_opt(2024, 8, 1).unwrap());
    }
}
