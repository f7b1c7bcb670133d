use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;
pub use tiffin_common::Paise;

use crate::settlement::BookingRequest;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------       UserType        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Guest,
    Vendor,
}

//--------------------------------------   SubscriptionModel   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum SubscriptionModel {
    #[serde(rename = "Per Day", alias = "PerDay")]
    PerDay,
    #[serde(rename = "Per Month", alias = "PerMonth")]
    PerMonth,
}

impl Display for SubscriptionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionModel::PerDay => write!(f, "Per Day"),
            SubscriptionModel::PerMonth => write!(f, "Per Month"),
        }
    }
}

impl FromStr for SubscriptionModel {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Per Day" | "PerDay" => Ok(Self::PerDay),
            "Per Month" | "PerMonth" => Ok(Self::PerMonth),
            s => Err(ConversionError(format!("Invalid subscription model: {s}"))),
        }
    }
}

//--------------------------------------       MealType        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Lunch,
    Dinner,
}

impl Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MealType::Lunch => write!(f, "lunch"),
            MealType::Dinner => write!(f, "dinner"),
        }
    }
}

impl FromStr for MealType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            s => Err(ConversionError(format!("Invalid meal type: {s}"))),
        }
    }
}

/// The set of meals an order delivers each day. Duplicates are collapsed and the order is normalised, so
/// `[dinner, lunch, lunch]` and `[lunch, dinner]` are the same selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MealType>", into = "Vec<MealType>")]
pub struct MealTypes(Vec<MealType>);

impl MealTypes {
    pub fn new<I: IntoIterator<Item = MealType>>(meals: I) -> Self {
        let mut meals = meals.into_iter().collect::<Vec<_>>();
        meals.sort();
        meals.dedup();
        Self(meals)
    }

    pub fn lunch_and_dinner() -> Self {
        Self::new([MealType::Lunch, MealType::Dinner])
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of meals to bill per day. An empty selection is billed as one meal.
    pub fn meals_per_day(&self) -> i64 {
        self.0.len().max(1) as i64
    }

    pub fn iter(&self) -> impl Iterator<Item = &MealType> {
        self.0.iter()
    }
}

impl From<Vec<MealType>> for MealTypes {
    fn from(value: Vec<MealType>) -> Self {
        Self::new(value)
    }
}

impl From<MealTypes> for Vec<MealType> {
    fn from(value: MealTypes) -> Self {
        value.0
    }
}

impl Display for MealTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(",");
        write!(f, "{s}")
    }
}

impl FromStr for MealTypes {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let meals = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(MealType::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(meals))
    }
}

#[cfg(feature = "sqlite")]
mod meal_types_sqlite {
    use sqlx::{
        encode::IsNull,
        error::BoxDynError,
        sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef},
        Decode,
        Encode,
        Sqlite,
        Type,
    };

    use super::MealTypes;

    impl Type<Sqlite> for MealTypes {
        fn type_info() -> SqliteTypeInfo {
            <String as Type<Sqlite>>::type_info()
        }

        fn compatible(ty: &SqliteTypeInfo) -> bool {
            <String as Type<Sqlite>>::compatible(ty)
        }
    }

    impl<'q> Encode<'q, Sqlite> for MealTypes {
        fn encode_by_ref(&self, buf: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
            <String as Encode<'q, Sqlite>>::encode(self.to_string(), buf)
        }
    }

    impl<'r> Decode<'r, Sqlite> for MealTypes {
        fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
            let s = <&str as Decode<Sqlite>>::decode(value)?;
            Ok(s.parse::<MealTypes>()?)
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order is paid for and meals are being delivered.
    Active,
    /// The guest cancelled the order and the unused portion was refunded to their wallet.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Active => write!(f, "Active"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Active");
            OrderStatusType::Active
        })
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
/// Administrative flag recording whether money has moved for the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

//--------------------------------------      PayoutStage      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum PayoutStage {
    /// The single payout of a per-day order
    Full,
    /// The first half of a per-month order, due on the start date
    FirstHalf,
    /// The remainder of a per-month order, due when the subscription expires
    Final,
    /// Replaces the whole schedule once an order is cancelled
    Refunded,
}

impl Display for PayoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutStage::Full => write!(f, "full"),
            PayoutStage::FirstHalf => write!(f, "firstHalf"),
            PayoutStage::Final => write!(f, "final"),
            PayoutStage::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Refunded,
}

//--------------------------------------      UserAccount      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    /// Wallet balance. Never negative.
    pub credit_amount: Paise,
    /// Set once a spend exhausts the wallet. Later top-ups do not clear it.
    pub credit_consumed: bool,
    pub referral_code: Option<String>,
    /// The referral code of the guest who referred this user
    pub referred_by: Option<String>,
    pub referral_used: bool,
    pub dob: Option<NaiveDate>,
    pub birthday_bonus_at: Option<DateTime<Utc>>,
    pub birthday_penalty_at: Option<DateTime<Utc>>,
    pub price_per_day: Paise,
    pub price_per_month_single: Paise,
    pub price_per_month_both: Paise,
    pub order_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn is_vendor(&self) -> bool {
        self.user_type == UserType::Vendor
    }

    pub fn pricing(&self) -> VendorPricing {
        VendorPricing {
            price_per_day: self.price_per_day,
            price_per_month_single: self.price_per_month_single,
            price_per_month_both: self.price_per_month_both,
        }
    }

    pub fn contact(&self) -> Contact {
        Contact { user_id: self.id, name: self.name.clone(), email: self.email.clone() }
    }

    pub fn wallet(&self) -> Wallet {
        Wallet { user_id: self.id, credit_amount: self.credit_amount, credit_consumed: self.credit_consumed }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VendorPricing {
    pub price_per_day: Paise,
    pub price_per_month_single: Paise,
    pub price_per_month_both: Paise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: i64,
    pub credit_amount: Paise,
    pub credit_consumed: bool,
}

/// Who to notify about an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub user_id: i64,
    pub name: String,
    pub email: String,
}

//--------------------------------------        NewUser        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    pub credit_amount: Paise,
    pub referral_code: Option<String>,
    pub referred_by: Option<String>,
    pub dob: Option<NaiveDate>,
    pub pricing: VendorPricing,
}

impl NewUser {
    pub fn guest(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            user_type: UserType::Guest,
            credit_amount: Paise::default(),
            referral_code: None,
            referred_by: None,
            dob: None,
            pricing: VendorPricing::default(),
        }
    }

    pub fn vendor(name: &str, email: &str, pricing: VendorPricing) -> Self {
        Self { user_type: UserType::Vendor, pricing, ..Self::guest(name, email) }
    }

    pub fn with_credit(mut self, credit: Paise) -> Self {
        self.credit_amount = credit;
        self
    }

    pub fn with_referral_code(mut self, code: &str) -> Self {
        self.referral_code = Some(code.to_string());
        self
    }

    pub fn referred_by(mut self, code: &str) -> Self {
        self.referred_by = Some(code.to_string());
        self
    }

    pub fn with_dob(mut self, dob: NaiveDate) -> Self {
        self.dob = Some(dob);
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub payment_id: Option<String>,
    pub provider_order_id: Option<String>,
    pub guest_id: i64,
    pub vendor_id: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub subscription_model: SubscriptionModel,
    pub quantity: i64,
    pub meal_types: MealTypes,
    pub starting_date: DateTime<Utc>,
    pub ending_date: DateTime<Utc>,
    pub number_of_months: Option<i64>,
    /// The quoted price before wallet credit. Fixed at creation.
    pub total_amount: Paise,
    pub credit_applied: Paise,
    pub vendor_share: Paise,
    pub used_amount: Paise,
    pub refund_amount: Paise,
    pub days_used: i64,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub expire_at: DateTime<Utc>,
    pub to_be_deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_active(&self) -> bool {
        self.status == OrderStatusType::Active
    }

    /// Amount the guest actually paid through the payment provider
    pub fn charged_amount(&self) -> Paise {
        self.total_amount - self.credit_applied
    }
}

//--------------------------------------        Payout         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payout {
    #[serde(skip)]
    pub order_id: i64,
    pub seq: i64,
    #[serde(rename = "id")]
    pub stage: PayoutStage,
    pub due_date: DateTime<Utc>,
    pub amount: Paise,
    pub status: PayoutStatus,
    pub paid_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayout {
    pub stage: PayoutStage,
    pub due_date: DateTime<Utc>,
    pub amount: Paise,
    pub status: PayoutStatus,
}

impl NewPayout {
    pub fn pending(stage: PayoutStage, due_date: DateTime<Utc>, amount: Paise) -> Self {
        Self { stage, due_date, amount, status: PayoutStatus::Pending }
    }
}

/// An order together with its payout schedule, in schedule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullOrder {
    #[serde(flatten)]
    pub order: Order,
    pub payouts: Vec<Payout>,
}

impl FullOrder {
    pub fn new(order: Order, payouts: Vec<Payout>) -> Self {
        Self { order, payouts }
    }

    pub fn id(&self) -> i64 {
        self.order.id
    }

    pub fn scheduled_total(&self) -> Paise {
        self.payouts.iter().map(|p| p.amount).sum()
    }

    pub fn next_pending_payout(&self) -> Option<&Payout> {
        self.payouts.iter().find(|p| p.status == PayoutStatus::Pending)
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// A fully priced and scheduled order, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub payment_id: Option<String>,
    pub provider_order_id: Option<String>,
    pub guest_id: i64,
    pub vendor_id: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub subscription_model: SubscriptionModel,
    pub quantity: i64,
    pub meal_types: MealTypes,
    pub starting_date: DateTime<Utc>,
    pub ending_date: DateTime<Utc>,
    pub number_of_months: Option<i64>,
    pub total_amount: Paise,
    pub vendor_share: Paise,
    pub payment_status: PaymentStatus,
    pub expire_at: DateTime<Utc>,
    pub payouts: Vec<NewPayout>,
    /// Bonus paid to the referrer if this order redeems the guest's referral
    pub referral_bonus: Option<Paise>,
}

//--------------------------------------     StagedBooking     ---------------------------------------------------------
/// A validated booking waiting for the payment provider to confirm the payment.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StagedBooking {
    pub id: i64,
    pub provider_order_id: String,
    pub booking: Json<BookingRequest>,
    pub quoted_total: Paise,
    pub created_at: DateTime<Utc>,
}

impl StagedBooking {
    pub fn request(&self) -> &BookingRequest {
        &self.booking.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct MealSelection {
    pub id: i64,
    pub guest_id: i64,
    pub vendor_id: i64,
    pub order_id: Option<i64>,
    pub meal_date: NaiveDate,
    pub meal_type: String,
    pub created_at: DateTime<Utc>,
}

/// A guest's meal choice for a given day with a vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMealSelection {
    pub guest_id: i64,
    pub vendor_id: i64,
    pub order_id: Option<i64>,
    pub meal_date: NaiveDate,
    pub meal_type: MealType,
}
