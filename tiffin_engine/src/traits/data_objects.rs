use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiffin_common::Paise;

use crate::{
    db_types::{Contact, FullOrder, NewPayout, Wallet},
    settlement::{CancellationSettlement, CreditApplication},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertOrderResult {
    Inserted(OrderInsertion),
    /// An order with the same payment id was already stored. Nothing was changed.
    AlreadyExists(FullOrder),
}

impl InsertOrderResult {
    pub fn order(&self) -> &FullOrder {
        match self {
            InsertOrderResult::Inserted(insertion) => &insertion.order,
            InsertOrderResult::AlreadyExists(order) => order,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, InsertOrderResult::Inserted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInsertion {
    pub order: FullOrder,
    pub vendor: Contact,
    pub credit: CreditApplication,
    pub referral: Option<ReferralCredit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralCredit {
    pub referrer: Contact,
    pub amount: Paise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthdayPenalty {
    pub amount: Paise,
    /// The penalty is not charged again if it was already charged at or after this instant
    pub not_since: DateTime<Utc>,
}

/// Everything the backend needs to cancel an order. The money has already been worked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCancellation {
    pub order_id: i64,
    pub guest_id: i64,
    pub vendor_id: i64,
    pub settlement: CancellationSettlement,
    pub payouts: Vec<NewPayout>,
    pub birthday_penalty: Option<BirthdayPenalty>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationResult {
    pub order: FullOrder,
    /// The guest's wallet after the refund (and any birthday penalty)
    pub wallet: Wallet,
    pub birthday_penalty: Option<Paise>,
    /// True if this was the guest's last active order with the vendor
    pub vendor_released: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// The service period ended
    Expired,
    /// The order was settled and its retention period passed
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedOrder {
    pub order_id: i64,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepResult {
    pub removed: Vec<RemovedOrder>,
    pub staged_bookings_purged: u64,
}

impl SweepResult {
    pub fn count(&self, reason: RemovalReason) -> usize {
        self.removed.iter().filter(|r| r.reason == reason).count()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.staged_bookings_purged == 0
    }
}

impl Display for SweepResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} expired and {} settled orders removed, {} stale bookings purged",
            self.count(RemovalReason::Expired),
            self.count(RemovalReason::Settled),
            self.staged_bookings_purged
        )
    }
}
