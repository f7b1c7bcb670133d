use chrono::{DateTime, Utc};
use thiserror::Error;
use tiffin_common::Paise;

use crate::{
    db_types::{FullOrder, NewOrder, Payout, StagedBooking},
    settlement::{BookingRequest, QuoteError},
    traits::{
        data_objects::{CancellationResult, InsertOrderResult, OrderCancellation, SweepResult},
        OrderManagement,
        WalletManagement,
    },
};

/// This trait defines the highest level of behaviour for backends supporting the settlement engine.
///
/// Every method that changes more than one record does so in a single atomic transaction. Callers compute the money
/// (quotes, settlements, payout schedules) beforehand; the backend only applies it, and performs the check-and-set
/// guards that make concurrent calls safe.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone + OrderManagement + WalletManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a validated booking under the payment provider's order id until the payment is confirmed.
    ///
    /// Fails with [`SettlementError::StagedBookingExists`] if a booking is already staged under that id.
    async fn stage_booking(
        &self,
        provider_order_id: &str,
        booking: &BookingRequest,
        quoted_total: Paise,
    ) -> Result<StagedBooking, SettlementError>;

    async fn fetch_staged_booking(&self, provider_order_id: &str) -> Result<Option<StagedBooking>, SettlementError>;

    /// Returns true if a staged booking was removed.
    async fn delete_staged_booking(&self, provider_order_id: &str) -> Result<bool, SettlementError>;

    /// Takes a new order, and in a single atomic transaction,
    /// * stores the order, unless an order with the same payment id already exists. In that case nothing else happens
    ///   and the existing order is returned.
    /// * stores the payout schedule,
    /// * spends the guest's wallet credit on per-month orders, and records the amount on the order,
    /// * credits the referrer if this order redeems the guest's referral,
    /// * increments the vendor's order count and adds the vendor to the guest's booked vendors,
    /// * deletes any booking staged under the order's provider order id.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, SettlementError>;

    /// Cancels an active order and applies the given settlement, in a single atomic transaction.
    ///
    /// The transaction opens with an `Active` to `Cancelled` check-and-set, so of two concurrent cancellations exactly
    /// one succeeds and the other fails with [`SettlementError::AlreadyCancelled`]. An order that does not exist or does
    /// not belong to the guest fails with [`SettlementError::NotFound`].
    ///
    /// Within the same transaction:
    /// * the birthday penalty is deducted if it is due, the balance covers it and it was not charged this month,
    /// * the refund is credited to the guest's wallet,
    /// * the settlement amounts are stored and the payout schedule is replaced,
    /// * the vendor's order count is decremented (never below zero),
    /// * if the guest has no other active orders with the vendor, the vendor is removed from the guest's booked vendors
    ///   and the guest's meal selections with that vendor are purged,
    /// * meal selections tied to this order are purged.
    async fn cancel_order(&self, cancellation: OrderCancellation) -> Result<CancellationResult, SettlementError>;

    /// Marks the first pending payout of the order as paid, sets the order's payment status to `Paid` and schedules the
    /// order for deletion at `to_be_deleted_at`.
    ///
    /// Fails with [`SettlementError::NoPendingPayout`], without changing anything, if every payout is already settled.
    async fn settle_next_payout(
        &self,
        order_id: i64,
        now: DateTime<Utc>,
        to_be_deleted_at: DateTime<Utc>,
    ) -> Result<(FullOrder, Payout), SettlementError>;

    /// Deletes orders whose `expire_at` or `to_be_deleted_at` is at or before `now`, along with their payouts.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepResult, SettlementError>;

    /// Deletes bookings that were staged before `older_than` and never confirmed. Returns the number deleted.
    async fn purge_staged_bookings(&self, older_than: DateTime<Utc>) -> Result<u64, SettlementError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), SettlementError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Invalid date range. {0}")]
    InvalidRange(String),
    #[error("Invalid meal selection. {0}")]
    InvalidMealSelection(String),
    #[error("Invalid subscription model: {0}")]
    InvalidModel(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),
    #[error("The payment could not be verified.")]
    PaymentVerificationFailed,
    #[error("The callback signature is invalid.")]
    InvalidSignature,
    #[error("The declared amount {declared} matches neither the charged amount {charged} nor the total {total}.")]
    AmountMismatch { declared: Paise, charged: Paise, total: Paise },
    #[error("Vendor {0} does not exist")]
    VendorNotFound(i64),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Order {0} has already been cancelled")]
    AlreadyCancelled(i64),
    #[error("Order {0} has no pending payouts")]
    NoPendingPayout(i64),
    #[error("Order {0} does not exist")]
    NotFound(i64),
    #[error("A booking is already staged for provider order {0}")]
    StagedBookingExists(String),
    #[error("The payload could not be read. {0}")]
    InvalidPayload(String),
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

impl From<QuoteError> for SettlementError {
    fn from(e: QuoteError) -> Self {
        match e {
            QuoteError::InvalidRange(s) => SettlementError::InvalidRange(s),
            QuoteError::InvalidMealSelection(s) => SettlementError::InvalidMealSelection(s),
            QuoteError::InvalidModel(s) => SettlementError::InvalidModel(s),
            QuoteError::InvalidQuantity(q) => SettlementError::InvalidQuantity(q),
        }
    }
}
