use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCancelledEvent,
    OrderCreatedEvent,
    PayoutSettledEvent,
    ReferralBonusEvent,
};

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_cancelled_producer: Vec<EventProducer<OrderCancelledEvent>>,
    pub referral_bonus_producer: Vec<EventProducer<ReferralBonusEvent>>,
    pub payout_settled_producer: Vec<EventProducer<PayoutSettledEvent>>,
}

impl EventProducers {
    pub fn is_empty(&self) -> bool {
        self.order_created_producer.is_empty()
            && self.order_cancelled_producer.is_empty()
            && self.referral_bonus_producer.is_empty()
            && self.payout_settled_producer.is_empty()
    }

    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for producer in &self.order_created_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_cancelled(&self, event: OrderCancelledEvent) {
        for producer in &self.order_cancelled_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_referral_bonus(&self, event: ReferralBonusEvent) {
        for producer in &self.referral_bonus_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payout_settled(&self, event: PayoutSettledEvent) {
        for producer in &self.payout_settled_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_cancelled: Option<EventHandler<OrderCancelledEvent>>,
    pub on_referral_bonus: Option<EventHandler<ReferralBonusEvent>>,
    pub on_payout_settled: Option<EventHandler<PayoutSettledEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_created: hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f)),
            on_order_cancelled: hooks.on_order_cancelled.map(|f| EventHandler::new(buffer_size, f)),
            on_referral_bonus: hooks.on_referral_bonus.map(|f| EventHandler::new(buffer_size, f)),
            on_payout_settled: hooks.on_payout_settled.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_cancelled {
            result.order_cancelled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_referral_bonus {
            result.referral_bonus_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payout_settled {
            result.payout_settled_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns every configured handler. Each one runs until the last producer subscribed to it is dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_cancelled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_referral_bonus {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payout_settled {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_cancelled: Option<Handler<OrderCancelledEvent>>,
    pub on_referral_bonus: Option<Handler<ReferralBonusEvent>>,
    pub on_payout_settled: Option<Handler<PayoutSettledEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_cancelled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCancelledEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_cancelled = Some(Arc::new(f));
        self
    }

    pub fn on_referral_bonus<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReferralBonusEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_referral_bonus = Some(Arc::new(f));
        self
    }

    pub fn on_payout_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PayoutSettledEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payout_settled = Some(Arc::new(f));
        self
    }
}
