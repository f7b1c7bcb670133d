use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiffin_common::Paise;

use crate::{
    db_types::{FullOrder, OrderStatusType, PayoutStatus, SubscriptionModel, Wallet},
    settlement::{CancellationSettlement, CreditApplication},
    traits::OrderInsertion,
};

/// The price of a booking, and what the guest would pay after their wallet credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub subscription_model: SubscriptionModel,
    pub total: Paise,
    /// A preview only. Credit is spent when the order is created.
    pub credit: CreditApplication,
    pub amount_to_charge: Paise,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBookingResponse {
    pub provider_order_id: String,
    pub quote: QuoteResponse,
}

/// Payment fields handed back to the client by the provider's checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPayment {
    pub provider_order_id: String,
    pub payment_id: String,
    pub signature: String,
    /// The amount the client says was paid. Must be within a paisa of the charged amount or the order total.
    pub declared_total: Paise,
}

/// What happened to a payment provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The event is not one we act on
    Ignored { event: String },
    /// An order for this payment already exists
    AlreadyProcessed { order_id: i64 },
    /// Nothing was staged under the provider order id
    NoStagedBooking { provider_order_id: String },
    /// The staged booking can no longer be turned into an order. Redelivering the callback will not change that.
    Rejected { provider_order_id: String, reason: String },
    Created { order_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    pub order: FullOrder,
    pub settlement: CancellationSettlement,
    pub wallet: Wallet,
    pub birthday_penalty: Option<Paise>,
}

/// An order as shown in a guest's booking list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestOrderView {
    #[serde(flatten)]
    pub order: FullOrder,
    pub cancel_allowed: bool,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorPayoutLine {
    pub order_id: i64,
    pub guest_name: String,
    pub vendor_share: Paise,
    pub status: OrderStatusType,
    pub payout_status: Option<PayoutStatus>,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorPayoutSummary {
    pub vendor_id: i64,
    pub vendor_name: String,
    pub total_share: Paise,
    pub total_paid: Paise,
    pub remaining: Paise,
    pub orders: Vec<VendorPayoutLine>,
}

impl VendorPayoutSummary {
    pub fn new(vendor_id: i64, vendor_name: String) -> Self {
        Self {
            vendor_id,
            vendor_name,
            total_share: Paise::default(),
            total_paid: Paise::default(),
            remaining: Paise::default(),
            orders: Vec::new(),
        }
    }

    /// Adds the line to the summary. The share counts as paid once the order's first payout is paid.
    pub fn add_line(&mut self, line: VendorPayoutLine) {
        self.total_share += line.vendor_share;
        if line.payout_status == Some(PayoutStatus::Paid) {
            self.total_paid += line.vendor_share;
        }
        self.remaining = self.total_share - self.total_paid;
        self.orders.push(line);
    }
}

/// The shape of the provider's `payment.captured` callback, reduced to the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallback {
    pub event: String,
    #[serde(default)]
    pub payload: Option<CallbackPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackPayload {
    pub payment: CallbackPayment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackPayment {
    pub entity: PaymentEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: String,
}

impl PaymentCallback {
    pub const PAYMENT_CAPTURED: &'static str = "payment.captured";

    pub fn is_captured(&self) -> bool {
        self.event == Self::PAYMENT_CAPTURED
    }

    pub fn entity(&self) -> Option<&PaymentEntity> {
        self.payload.as_ref().map(|p| &p.payment.entity)
    }
}

/// The result of an order creation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "order", rename_all = "snake_case")]
pub enum OrderCreationResult {
    Created(FullOrder),
    AlreadyExists(FullOrder),
}

impl OrderCreationResult {
    pub fn order(&self) -> &FullOrder {
        match self {
            OrderCreationResult::Created(o) | OrderCreationResult::AlreadyExists(o) => o,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, OrderCreationResult::Created(_))
    }
}

impl From<OrderInsertion> for OrderCreationResult {
    fn from(insertion: OrderInsertion) -> Self {
        OrderCreationResult::Created(insertion.order)
    }
}
