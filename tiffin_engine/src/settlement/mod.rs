//! # Settlement rules
//!
//! Pure, side-effect free business rules. Nothing in this module touches the database or the clock; callers supply
//! the current instant and the civil clock explicitly.
//!
//! * [`booking`] turns loosely typed booking payloads into validated [`BookingRequest`]s.
//! * [`quote`] prices a subscription from the vendor's pricing.
//! * [`credit`] decides how wallet credit, birthday bonuses and birthday penalties apply.
//! * [`proration`] computes usage, penalty and refund when an order is cancelled.
//! * [`schedule`] derives order dates and vendor payout schedules.
//! * [`policy`] holds the tunable constants.
pub mod booking;
pub mod credit;
pub mod policy;
pub mod proration;
pub mod quote;
pub mod schedule;

pub use booking::{BookingPayload, BookingRequest, SubscriptionTerms};
pub use credit::{apply_credit, CreditApplication};
pub use policy::SettlementPolicy;
pub use proration::{days_used, settle_cancellation, CancellationSettlement};
pub use quote::{quote, QuoteError};
pub use schedule::{initial_payouts, order_dates, refund_payouts, OrderDates};
