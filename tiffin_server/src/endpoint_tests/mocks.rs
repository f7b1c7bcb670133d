use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use mockall::mock;
use tiffin_common::Paise;
use tiffin_engine::{
    db_types::{FullOrder, MealSelection, NewMealSelection, NewUser, UserAccount, Wallet},
    notifications::{Notification, NotificationError, Notifier},
    traits::{OrderManagement, SettlementError, WalletManagement},
};

mock! {
    pub WalletStore {}
    impl WalletManagement for WalletStore {
        async fn create_user(&self, user: NewUser) -> Result<UserAccount, SettlementError>;
        async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, SettlementError>;
        async fn fetch_wallet(&self, user_id: i64) -> Result<Option<Wallet>, SettlementError>;
        async fn credit_wallet(&self, user_id: i64, amount: Paise) -> Result<Wallet, SettlementError>;
        async fn grant_birthday_bonus(&self, user_id: i64, amount: Paise, now: DateTime<Utc>, granted_before: DateTime<Utc>) -> Result<Option<Wallet>, SettlementError>;
        async fn fetch_booked_vendors(&self, guest_id: i64) -> Result<Vec<i64>, SettlementError>;
        async fn add_meal_selection(&self, selection: NewMealSelection) -> Result<MealSelection, SettlementError>;
        async fn fetch_meal_selections(&self, guest_id: i64) -> Result<Vec<MealSelection>, SettlementError>;
    }
    impl OrderManagement for WalletStore {
        async fn fetch_order(&self, order_id: i64) -> Result<Option<FullOrder>, SettlementError>;
        async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<FullOrder>, SettlementError>;
        async fn fetch_orders_for_guest(&self, guest_id: i64) -> Result<Vec<FullOrder>, SettlementError>;
        async fn fetch_orders_for_vendor(&self, vendor_id: i64) -> Result<Vec<FullOrder>, SettlementError>;
        async fn fetch_all_orders(&self) -> Result<Vec<FullOrder>, SettlementError>;
        async fn has_active_monthly_order(&self, guest_id: i64, at: DateTime<Utc>) -> Result<bool, SettlementError>;
    }
}

mock! {
    pub Notifier {}
    impl Notifier for Notifier {
        fn notify(&self, notification: Notification) -> BoxFuture<'static, Result<(), NotificationError>>;
    }
}
