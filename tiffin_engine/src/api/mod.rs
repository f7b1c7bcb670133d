//! # Settlement engine public API
//!
//! The `api` module exposes the programmatic API of the settlement engine. The API is modular, so that clients can
//! pick the parts they need.
//!
//! * [`order_flow_api`] is the primary API. It quotes and stages bookings, creates orders from client payment
//!   confirmations and from payment provider callbacks, cancels orders and lists them.
//! * [`wallet_api`] reads wallets and grants birthday bonuses.
//! * [`payout_api`] settles vendor payouts and summarises what each vendor is owed.
//! * [`expiry_api`] removes expired and settled orders.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend that implements the backend traits it needs.
//!
//! ```rust,ignore
//! use tiffin_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements SettlementDatabase
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let quote = api.quote(booking).await?;
//! ```
pub mod expiry_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payout_api;
pub mod wallet_api;
