use std::time::Duration;

use log::*;
use tiffin_engine::{traits::RemovalReason, ExpiryApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    interval: Duration,
    staged_booking_ttl: Option<chrono::Duration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = ExpiryApi::new(db).with_staged_booking_ttl(staged_booking_ttl);
        info!("🕰️ Order expiry worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running order expiry job");
            match api.sweep(chrono::Utc::now()).await {
                Ok(result) if !result.is_empty() => {
                    info!(
                        "🕰️ {} orders expired, {} settled orders removed",
                        result.count(RemovalReason::Expired),
                        result.count(RemovalReason::Settled)
                    );
                    debug!(
                        "🕰️ Removed orders: {}",
                        result.removed.iter().map(|r| r.order_id.to_string()).collect::<Vec<_>>().join(", ")
                    );
                },
                Ok(_) => {},
                Err(e) => {
                    error!("🕰️ Error running order expiry job: {e}");
                },
            }
        }
    })
}
