use chrono::Duration;
use tiffin_common::Paise;

/// Tunable constants of the settlement rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementPolicy {
    /// Share of the pre-credit order total that goes to the vendor
    pub vendor_share_percent: i64,
    /// Charged on the order total when a guest cancels
    pub cancellation_penalty_percent: i64,
    /// Civil time of day (minutes after midnight) from which the start day counts as used on a same-day cancellation
    pub same_day_cutoff_minutes: u32,
    /// Monthly subscriptions booked at or after this civil hour start the next day
    pub monthly_start_cutoff_hour: u32,
    pub days_per_month: i64,
    /// How long a settled order is kept after its last service day
    pub deletion_delay: Duration,
    /// Orders can be cancelled without a warning within this long of their start
    pub cancel_window: Duration,
    pub referral_bonus: Paise,
    pub birthday_bonus: Paise,
    pub birthday_penalty: Paise,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            vendor_share_percent: 90,
            cancellation_penalty_percent: 2,
            same_day_cutoff_minutes: 12 * 60 + 30,
            monthly_start_cutoff_hour: 11,
            days_per_month: 30,
            deletion_delay: Duration::days(2),
            cancel_window: Duration::days(7),
            referral_bonus: Paise::from_rupees(100),
            birthday_bonus: Paise::from_rupees(100),
            birthday_penalty: Paise::from_rupees(100),
        }
    }
}

impl SettlementPolicy {
    pub fn vendor_share(&self, amount: Paise) -> Paise {
        amount.percent(self.vendor_share_percent)
    }

    pub fn cancellation_penalty(&self, total: Paise) -> Paise {
        total.percent(self.cancellation_penalty_percent)
    }
}
