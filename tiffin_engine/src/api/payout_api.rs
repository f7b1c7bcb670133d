use std::{collections::BTreeMap, fmt::Debug};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    api::order_objects::{VendorPayoutLine, VendorPayoutSummary},
    db_types::{FullOrder, Payout},
    events::{EventProducers, PayoutSettledEvent},
    settlement::{
        schedule::{deletion_time, vendor_due_date},
        SettlementPolicy,
    },
    traits::{SettlementDatabase, SettlementError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub order: FullOrder,
    /// The payout that was just settled
    pub payout: Payout,
}

/// Administrative settlement of vendor payouts.
pub struct PayoutApi<B> {
    db: B,
    producers: EventProducers,
    policy: SettlementPolicy,
}

impl<B> Debug for PayoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi")
    }
}

impl<B> PayoutApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, policy: SettlementPolicy::default() }
    }

    pub fn with_policy(mut self, policy: SettlementPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> PayoutApi<B>
where B: SettlementDatabase
{
    /// See [`Self::mark_payout_paid_at`]
    pub async fn mark_payout_paid(&self, order_id: i64) -> Result<PayoutReceipt, SettlementError> {
        self.mark_payout_paid_at(order_id, Utc::now()).await
    }

    /// Records that the order's next pending payout has been paid out.
    ///
    /// The order is marked as paid and scheduled for deletion: two days from now for per-day orders, and two days
    /// after the last service day for per-month orders. Fails with [`SettlementError::NotFound`] if the order does
    /// not exist and with [`SettlementError::NoPendingPayout`] if there is nothing left to pay. Neither failure
    /// changes anything.
    pub async fn mark_payout_paid_at(
        &self,
        order_id: i64,
        now: DateTime<Utc>,
    ) -> Result<PayoutReceipt, SettlementError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(SettlementError::NotFound(order_id))?;
        if order.next_pending_payout().is_none() {
            return Err(SettlementError::NoPendingPayout(order_id));
        }
        let delete_at = deletion_time(order.order.subscription_model, order.order.ending_date, now, &self.policy);
        let (order, payout) = self.db.settle_next_payout(order_id, now, delete_at).await?;
        info!(
            "🔄️💸️ Payout {} of {} for order #{order_id} settled. Deletion due at {delete_at}",
            payout.stage, payout.amount
        );
        match self.db.fetch_user(order.order.vendor_id).await? {
            Some(vendor) => {
                let event = PayoutSettledEvent::new(order.clone(), vendor.contact(), payout.clone());
                self.producers.publish_payout_settled(event).await;
            },
            None => warn!("🔄️💸️ Vendor #{} of order #{order_id} no longer exists", order.order.vendor_id),
        }
        Ok(PayoutReceipt { order, payout })
    }

    /// A per-vendor summary of the shares owed on every stored order, ordered by vendor id.
    pub async fn vendor_payout_summary(&self) -> Result<Vec<VendorPayoutSummary>, SettlementError> {
        let orders = self.db.fetch_all_orders().await?;
        let mut summaries = BTreeMap::<i64, VendorPayoutSummary>::new();
        for full in orders {
            let order = &full.order;
            if !summaries.contains_key(&order.vendor_id) {
                let name = self.db.fetch_user(order.vendor_id).await?.map(|v| v.name).unwrap_or_default();
                summaries.insert(order.vendor_id, VendorPayoutSummary::new(order.vendor_id, name));
            }
            let line = VendorPayoutLine {
                order_id: order.id,
                guest_name: order.name.clone(),
                vendor_share: order.vendor_share,
                status: order.status,
                payout_status: full.payouts.first().map(|p| p.status),
                due_date: vendor_due_date(order.subscription_model, order.starting_date),
            };
            if let Some(summary) = summaries.get_mut(&order.vendor_id) {
                summary.add_line(line);
            }
        }
        Ok(summaries.into_values().collect())
    }
}
