//! Outbound notifications.
//!
//! The engine never delivers mail itself. Engine events are turned into [`Notification`]s and handed to a
//! [`Notifier`] through the event hook system. Delivery is best-effort: a failed notification is logged and dropped,
//! and never affects the order that triggered it.
use std::sync::Arc;

use futures_util::future::{self, BoxFuture};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::{
    db_types::Contact,
    events::{EventHooks, OrderCancelledEvent, OrderCreatedEvent, PayoutSettledEvent, ReferralBonusEvent},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Contact,
    pub subject: String,
    /// Name of the template the mail relay renders
    pub template: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Could not reach the notification gateway. {0}")]
    Unreachable(String),
    #[error("The notification gateway rejected the message with status {status}. {message}")]
    Rejected { status: u16, message: String },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> BoxFuture<'static, Result<(), NotificationError>>;
}

/// Writes notifications to the log. Used when no mail relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) -> BoxFuture<'static, Result<(), NotificationError>> {
        info!(
            "📬️ [{}] to {} <{}>: {}",
            notification.template, notification.recipient.name, notification.recipient.email, notification.subject
        );
        Box::pin(future::ready(Ok(())))
    }
}

impl Notification {
    pub fn order_created(ev: &OrderCreatedEvent) -> Self {
        let order = &ev.order.order;
        Self {
            recipient: ev.vendor.clone(),
            subject: format!("New {} order #{} from {}", order.subscription_model, order.id, order.name),
            template: "order_created".into(),
            data: json!({
                "order_id": order.id,
                "guest_name": order.name,
                "phone": order.phone,
                "address": order.address,
                "meal_types": order.meal_types.to_string(),
                "quantity": order.quantity,
                "starting_date": order.starting_date,
                "ending_date": order.ending_date,
                "vendor_share": order.vendor_share.to_string(),
            }),
        }
    }

    pub fn order_cancelled(ev: &OrderCancelledEvent) -> Self {
        let order = &ev.order.order;
        Self {
            recipient: ev.vendor.clone(),
            subject: format!("Order #{} was cancelled by {}", order.id, order.name),
            template: "order_cancelled".into(),
            data: json!({
                "order_id": order.id,
                "guest_name": order.name,
                "days_used": ev.settlement.days_used,
                "used_amount": ev.settlement.used_amount.to_string(),
                "penalty": ev.settlement.penalty.to_string(),
                "refund": ev.settlement.refund.to_string(),
                "vendor_share": ev.settlement.vendor_share.to_string(),
            }),
        }
    }

    pub fn referral_bonus(ev: &ReferralBonusEvent) -> Self {
        Self {
            recipient: ev.referrer.clone(),
            subject: format!("You earned {} in credit", ev.amount),
            template: "referral_bonus".into(),
            data: json!({ "referee_name": ev.referee_name, "amount": ev.amount.to_string() }),
        }
    }

    pub fn payout_settled(ev: &PayoutSettledEvent) -> Self {
        Self {
            recipient: ev.vendor.clone(),
            subject: format!("Payout of {} for order #{} has been paid", ev.payout.amount, ev.order.id()),
            template: "payout_settled".into(),
            data: json!({
                "order_id": ev.order.id(),
                "stage": ev.payout.stage.to_string(),
                "amount": ev.payout.amount.to_string(),
                "paid_on": ev.payout.paid_on,
            }),
        }
    }
}

async fn deliver(notifier: Arc<dyn Notifier>, notification: Notification) {
    let template = notification.template.clone();
    match notifier.notify(notification).await {
        Ok(()) => debug!("📬️ '{template}' notification delivered"),
        Err(e) => warn!("📬️ '{template}' notification was not delivered. {e}"),
    }
}

/// Event hooks that forward every engine event to `notifier`.
pub fn notification_hooks(notifier: Arc<dyn Notifier>) -> EventHooks {
    let mut hooks = EventHooks::default();
    let n = Arc::clone(&notifier);
    hooks.on_order_created(move |ev| Box::pin(deliver(Arc::clone(&n), Notification::order_created(&ev))));
    let n = Arc::clone(&notifier);
    hooks.on_order_cancelled(move |ev| Box::pin(deliver(Arc::clone(&n), Notification::order_cancelled(&ev))));
    let n = Arc::clone(&notifier);
    hooks.on_referral_bonus(move |ev| Box::pin(deliver(Arc::clone(&n), Notification::referral_bonus(&ev))));
    let n = notifier;
    hooks.on_payout_settled(move |ev| Box::pin(deliver(Arc::clone(&n), Notification::payout_settled(&ev))));
    hooks
}
