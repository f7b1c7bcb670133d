//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or open a transaction and pass
//! `&mut tx` through to the functions without any other changes.
//!
//! Timestamps that take part in comparisons (`expire_at`, `to_be_deleted_at`, `due_date`, staging times) are always
//! bound from Rust, so they share one text format and compare correctly as strings.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod meal_selections;
pub mod orders;
pub mod payouts;
pub mod staged_bookings;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/tiffin_store.db";

pub fn db_url() -> String {
    let result = env::var("TIFFIN_DATABASE_URL").unwrap_or_else(|_| {
        info!("TIFFIN_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
