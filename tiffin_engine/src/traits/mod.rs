//! # Backend contracts
//!
//! The traits in this module define what a storage backend must provide for the settlement engine to run on it.
//! The public APIs are generic over these traits, so the same flows run against SQLite in production and against mocks
//! in tests.
//!
//! * [`SettlementDatabase`] is the highest level of behaviour. It owns every multi-step write: order creation,
//!   cancellation, payout settlement, staged bookings and the expiry sweep. Each of these runs in a single transaction.
//! * [`OrderManagement`] provides read access to orders and their payout schedules.
//! * [`WalletManagement`] manages users and their wallet credit.
mod data_objects;
mod order_management;
mod settlement_database;
mod wallet_management;

pub use data_objects::{
    BirthdayPenalty,
    CancellationResult,
    InsertOrderResult,
    OrderCancellation,
    OrderInsertion,
    ReferralCredit,
    RemovalReason,
    RemovedOrder,
    SweepResult,
};
pub use order_management::OrderManagement;
pub use settlement_database::{SettlementDatabase, SettlementError};
pub use wallet_management::WalletManagement;
