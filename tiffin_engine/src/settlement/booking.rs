use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tiffin_common::Paise;

use crate::{
    db_types::{MealType, MealTypes, SubscriptionModel, VendorPricing},
    settlement::{quote, QuoteError},
};

/// The term of a subscription. Per-day orders run over an inclusive range of civil dates, per-month orders for a
/// number of 30-day months starting on the booking day (or the next day, after the morning cut-off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum SubscriptionTerms {
    #[serde(rename = "Per Day")]
    PerDay { starting_date: NaiveDate, ending_date: NaiveDate },
    #[serde(rename = "Per Month")]
    PerMonth { number_of_months: i64 },
}

impl SubscriptionTerms {
    pub fn model(&self) -> SubscriptionModel {
        match self {
            SubscriptionTerms::PerDay { .. } => SubscriptionModel::PerDay,
            SubscriptionTerms::PerMonth { .. } => SubscriptionModel::PerMonth,
        }
    }
}

/// A validated booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub guest_id: i64,
    pub vendor_id: i64,
    pub terms: SubscriptionTerms,
    pub meal_types: MealTypes,
    pub quantity: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl BookingRequest {
    pub fn model(&self) -> SubscriptionModel {
        self.terms.model()
    }

    pub fn quote(&self, pricing: &VendorPricing) -> Result<Paise, QuoteError> {
        quote(&self.terms, pricing, self.quantity, &self.meal_types)
    }
}

/// A booking as it arrives from a client. Field values are strings until [`BookingPayload::validate`] checks them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    pub guest_id: i64,
    pub vendor_id: i64,
    pub subscription_model: String,
    #[serde(default)]
    pub starting_date: Option<String>,
    #[serde(default)]
    pub ending_date: Option<String>,
    #[serde(default)]
    pub number_of_months: Option<i64>,
    #[serde(default, alias = "timeType")]
    pub meal_types: Vec<String>,
    pub quantity: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl BookingPayload {
    pub fn validate(self) -> Result<BookingRequest, QuoteError> {
        let model = SubscriptionModel::from_str(self.subscription_model.trim())
            .map_err(|_| QuoteError::InvalidModel(self.subscription_model.clone()))?;
        if !(1..=super::quote::MAX_QUANTITY).contains(&self.quantity) {
            return Err(QuoteError::InvalidQuantity(self.quantity));
        }
        let meals = self
            .meal_types
            .iter()
            .map(|m| MealType::from_str(m))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| QuoteError::InvalidMealSelection(e.to_string()))?;
        let meal_types = MealTypes::new(meals);
        if meal_types.is_empty() {
            return Err(QuoteError::InvalidMealSelection("At least one meal must be selected".into()));
        }
        let terms = match model {
            SubscriptionModel::PerDay => {
                let starting_date = parse_date("startingDate", self.starting_date.as_deref())?;
                let ending_date = parse_date("endingDate", self.ending_date.as_deref())?;
                if ending_date < starting_date {
                    return Err(QuoteError::InvalidRange(format!(
                        "The ending date {ending_date} is before the starting date {starting_date}"
                    )));
                }
                SubscriptionTerms::PerDay { starting_date, ending_date }
            },
            SubscriptionModel::PerMonth => {
                let number_of_months = self.number_of_months.unwrap_or(1);
                super::quote::check_months(number_of_months)?;
                SubscriptionTerms::PerMonth { number_of_months }
            },
        };
        Ok(BookingRequest {
            guest_id: self.guest_id,
            vendor_id: self.vendor_id,
            terms,
            meal_types,
            quantity: self.quantity,
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
        })
    }
}

/// Accepts `YYYY-MM-DD`, or a timestamp that starts with one
fn parse_date(field: &str, value: Option<&str>) -> Result<NaiveDate, QuoteError> {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| {
        QuoteError::InvalidRange(format!("{field} is required for per-day subscriptions"))
    })?;
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| QuoteError::InvalidRange(format!("{field} '{value}' is not a valid date. {e}")))
}
