use serde::{Deserialize, Serialize};
use tiffin_common::Paise;

use crate::{
    db_types::{Contact, FullOrder, Payout},
    settlement::CancellationSettlement,
};

/// A new order was committed, by either the client confirmation or the payment callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: FullOrder,
    pub vendor: Contact,
}

impl OrderCreatedEvent {
    pub fn new(order: FullOrder, vendor: Contact) -> Self {
        Self { order, vendor }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: FullOrder,
    pub vendor: Contact,
    pub settlement: CancellationSettlement,
}

impl OrderCancelledEvent {
    pub fn new(order: FullOrder, vendor: Contact, settlement: CancellationSettlement) -> Self {
        Self { order, vendor, settlement }
    }
}

/// A referrer was credited because the guest they referred placed a monthly order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralBonusEvent {
    pub referrer: Contact,
    pub referee_name: String,
    pub amount: Paise,
}

impl ReferralBonusEvent {
    pub fn new(referrer: Contact, referee_name: String, amount: Paise) -> Self {
        Self { referrer, referee_name, amount }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSettledEvent {
    pub order: FullOrder,
    pub vendor: Contact,
    pub payout: Payout,
}

impl PayoutSettledEvent {
    pub fn new(order: FullOrder, vendor: Contact, payout: Payout) -> Self {
        Self { order, vendor, payout }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderCancelled(OrderCancelledEvent),
    ReferralBonus(ReferralBonusEvent),
    PayoutSettled(PayoutSettledEvent),
}
