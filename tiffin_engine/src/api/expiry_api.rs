use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::traits::{SettlementDatabase, SettlementError, SweepResult};

/// Removes orders whose service period ended or whose retention period after settlement passed.
///
/// Optionally, bookings that were staged but never paid for are purged once they are older than a configured age.
#[derive(Clone)]
pub struct ExpiryApi<B> {
    db: B,
    staged_booking_ttl: Option<Duration>,
}

impl<B> Debug for ExpiryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExpiryApi (staged booking ttl: {:?})", self.staged_booking_ttl)
    }
}

impl<B> ExpiryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, staged_booking_ttl: None }
    }

    pub fn with_staged_booking_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.staged_booking_ttl = ttl;
        self
    }
}

impl<B> ExpiryApi<B>
where B: SettlementDatabase
{
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepResult, SettlementError> {
        let mut result = self.db.sweep_expired(now).await?;
        if let Some(ttl) = self.staged_booking_ttl {
            result.staged_bookings_purged = self.db.purge_staged_bookings(now - ttl).await?;
        }
        if result.is_empty() {
            trace!("🕰️ Sweep at {now} found nothing to remove");
        } else {
            info!("🕰️ Sweep at {now}: {result}");
        }
        Ok(result)
    }
}
