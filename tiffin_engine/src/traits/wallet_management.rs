use chrono::{DateTime, Utc};
use tiffin_common::Paise;

use crate::{
    db_types::{MealSelection, NewMealSelection, NewUser, UserAccount, Wallet},
    traits::SettlementError,
};

/// Users and their wallet credit.
///
/// Every balance change is a single conditional `UPDATE`, so concurrent changes to the same wallet are serialized
/// by the database and a balance can never go negative.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    async fn create_user(&self, user: NewUser) -> Result<UserAccount, SettlementError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, SettlementError>;

    async fn fetch_wallet(&self, user_id: i64) -> Result<Option<Wallet>, SettlementError>;

    /// Adds `amount` to the user's balance. The `credit_consumed` flag is left as is.
    async fn credit_wallet(&self, user_id: i64, amount: Paise) -> Result<Wallet, SettlementError>;

    /// Adds `amount` to the user's balance, but only if no birthday bonus was granted at or after `granted_before`.
    /// Returns `None` if the bonus was not granted.
    async fn grant_birthday_bonus(
        &self,
        user_id: i64,
        amount: Paise,
        now: DateTime<Utc>,
        granted_before: DateTime<Utc>,
    ) -> Result<Option<Wallet>, SettlementError>;

    /// The ids of the vendors the guest currently has bookings with
    async fn fetch_booked_vendors(&self, guest_id: i64) -> Result<Vec<i64>, SettlementError>;

    async fn add_meal_selection(&self, selection: NewMealSelection) -> Result<MealSelection, SettlementError>;

    async fn fetch_meal_selections(&self, guest_id: i64) -> Result<Vec<MealSelection>, SettlementError>;
}
