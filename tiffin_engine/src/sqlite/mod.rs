//! SQLite backend for the settlement engine.
//!
//! Migrations live in `migrations/` next to this module.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
