//! Tiffin Settlement Engine
//!
//! The settlement engine turns a vendor's pricing and a guest's subscription request into a consistently priced,
//! idempotently created order, and tracks that order through vendor payouts, cancellation and expiry.
//! This library contains the core logic. It knows nothing about HTTP; the server crate is a thin layer on top of it.
//!
//! The library is divided into these main sections:
//! 1. The settlement rules ([`mod@settlement`]). Pure functions for quoting, wallet credit, proration and payout
//!    schedules. They take the current time as an argument and never touch the database.
//! 2. Backend contracts ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]). You should never need to access
//!    the database directly. The exception is the data types stored in it, which are defined in [`mod@db_types`].
//! 3. The public API ([`mod@api`]). [`OrderFlowApi`], [`WalletApi`], [`PayoutApi`] and [`ExpiryApi`] are generic over
//!    the backend traits, so they can be run against mocks in tests.
//!
//! The engine also emits events when orders are created, cancelled or paid out, and when a referral bonus is granted.
//! A simple actor framework ([`mod@events`]) lets you hook into these events. [`mod@notifications`] uses it to hand
//! messages to an external notification gateway.
pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod notifications;
pub mod settlement;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    expiry_api::ExpiryApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    payout_api::{PayoutApi, PayoutReceipt},
    wallet_api::{BirthdayBonusOutcome, WalletApi},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    InsertOrderResult,
    OrderManagement,
    SettlementDatabase,
    SettlementError,
    SweepResult,
    WalletManagement,
};
