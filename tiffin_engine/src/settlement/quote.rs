use thiserror::Error;
use tiffin_common::Paise;

use crate::{
    db_types::{MealTypes, VendorPricing},
    settlement::SubscriptionTerms,
};

pub const MAX_QUANTITY: i64 = 10;
pub const MAX_MONTHS: i64 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("Invalid date range. {0}")]
    InvalidRange(String),
    #[error("Invalid meal selection. {0}")]
    InvalidMealSelection(String),
    #[error("Invalid subscription model: {0}")]
    InvalidModel(String),
    #[error("Quantity must be between 1 and {MAX_QUANTITY}, but was {0}")]
    InvalidQuantity(i64),
}

/// Prices a subscription from the vendor's current pricing.
///
/// * Per-day: `days * price_per_day * max(1, meals) * quantity`, where `days` counts both end dates.
/// * Per-month: `months * monthly_price * quantity`. The monthly price depends on whether one or both meals are
///   selected; any other meal count is rejected.
pub fn quote(
    terms: &SubscriptionTerms,
    pricing: &VendorPricing,
    quantity: i64,
    meal_types: &MealTypes,
) -> Result<Paise, QuoteError> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(QuoteError::InvalidQuantity(quantity));
    }
    match terms {
        SubscriptionTerms::PerDay { starting_date, ending_date } => {
            if ending_date < starting_date {
                return Err(QuoteError::InvalidRange(format!(
                    "The ending date {ending_date} is before the starting date {starting_date}"
                )));
            }
            let days = (*ending_date - *starting_date).num_days() + 1;
            checked_total(pricing.price_per_day, &[days, meal_types.meals_per_day(), quantity])
        },
        SubscriptionTerms::PerMonth { number_of_months } => {
            check_months(*number_of_months)?;
            let monthly_price = match meal_types.count() {
                1 => pricing.price_per_month_single,
                2 => pricing.price_per_month_both,
                n => {
                    return Err(QuoteError::InvalidMealSelection(format!(
                        "Monthly subscriptions need one or two meals per day, not {n}"
                    )))
                },
            };
            checked_total(monthly_price, &[*number_of_months, quantity])
        },
    }
}

pub(crate) fn check_months(number_of_months: i64) -> Result<(), QuoteError> {
    if (1..=MAX_MONTHS).contains(&number_of_months) {
        Ok(())
    } else {
        Err(QuoteError::InvalidRange(format!(
            "A monthly subscription runs for 1 to {MAX_MONTHS} months, not {number_of_months}"
        )))
    }
}

fn checked_total(price: Paise, factors: &[i64]) -> Result<Paise, QuoteError> {
    factors
        .iter()
        .try_fold(price, |acc, f| acc.checked_mul(*f))
        .ok_or_else(|| QuoteError::InvalidRange("The subscription is too long to price".into()))
}
