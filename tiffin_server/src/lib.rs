//! # Tiffin server
//! This crate hosts the HTTP service for the tiffin settlement engine. It is a thin layer: every business rule lives in
//! `tiffin_engine`. The server is responsible for:
//! * Accepting booking requests, and either staging them or creating the order when the client already holds the
//!   payment provider's signed payment fields.
//! * Receiving the payment provider's callbacks.
//! * Guest-facing order, cancellation and wallet routes.
//! * Admin routes for settling vendor payouts.
//! * Running the expiry worker, and relaying engine events to the notification gateway.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Quotes, bookings, orders, cancellations and wallets.
//! * `/webhooks/payment`: The payment provider's callback.
//! * `/admin/...`: Payout settlement and the vendor payout summary. Requires the `X-Admin-Token` header.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod middleware;
pub mod notifier;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
