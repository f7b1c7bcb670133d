use chrono::{DateTime, Utc};

use crate::{db_types::FullOrder, traits::SettlementError};

/// Read access to orders. Every order is returned together with its payout schedule.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<FullOrder>, SettlementError>;

    async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<FullOrder>, SettlementError>;

    /// All orders placed by the guest, newest first
    async fn fetch_orders_for_guest(&self, guest_id: i64) -> Result<Vec<FullOrder>, SettlementError>;

    /// All orders placed with the vendor, newest first
    async fn fetch_orders_for_vendor(&self, vendor_id: i64) -> Result<Vec<FullOrder>, SettlementError>;

    /// Every order in the store, ordered by vendor and then by id
    async fn fetch_all_orders(&self) -> Result<Vec<FullOrder>, SettlementError>;

    /// True if the guest has an active per-month order whose service period covers `at`.
    async fn has_active_monthly_order(&self, guest_id: i64, at: DateTime<Utc>) -> Result<bool, SettlementError>;
}
