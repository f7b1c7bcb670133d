use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tiffin_common::Paise;
use tiffin_engine::{
    db_types::NewUser,
    events::{EventHandlers, EventHooks},
    test_utils::seed::*,
    OrderFlowApi,
    PayoutApi,
    SettlementDatabase,
    WalletManagement,
};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }

    /// Handlers run on their own tasks, so give them a moment to catch up
    pub async fn wait_for(&self, expected: i32) -> i32 {
        for _ in 0..50 {
            if self.count() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.count()
    }
}

#[tokio::test]
async fn hooks_fire_after_each_flow() {
    let created = HookCalled::default();
    let cancelled = HookCalled::default();
    let referrals = HookCalled::default();
    let payouts = HookCalled::default();
    let referral_amounts = Arc::new(Mutex::new(Vec::new()));

    let mut hooks = EventHooks::default();
    let c = created.clone();
    hooks.on_order_created(move |ev| {
        info!("🪝️ Order #{} created", ev.order.id());
        c.called();
        Box::pin(async {})
    });
    let c = cancelled.clone();
    hooks.on_order_cancelled(move |ev| {
        info!("🪝️ Order #{} cancelled. Refund {}", ev.order.id(), ev.settlement.refund);
        c.called();
        Box::pin(async {})
    });
    let c = referrals.clone();
    let amounts = referral_amounts.clone();
    hooks.on_referral_bonus(move |ev| {
        c.called();
        if let Ok(mut list) = amounts.lock() {
            list.push((ev.referrer.name.clone(), ev.amount));
        }
        Box::pin(async {})
    });
    let c = payouts.clone();
    hooks.on_payout_settled(move |ev| {
        info!("🪝️ Payout {} settled for {}", ev.payout.stage, ev.vendor.name);
        c.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let mut db = new_database().await;
    let orders = OrderFlowApi::new(db.clone(), producers.clone()).with_verifier(verifier());
    let payout_api = PayoutApi::new(db.clone(), producers);
    let vendor = create_vendor(&db, "Annapurna").await;
    db.create_user(NewUser::guest("Meera", "meera@guest.example").with_referral_code("MEERA10")).await.unwrap();
    let guest = db.create_user(NewUser::guest("Kiran", "kiran@guest.example").referred_by("MEERA10")).await.unwrap();
    let now = civil_time(2024, 6, 9, 9, 0);

    let payment = client_payment("order_1", "pay_1", Paise::from_rupees(1_000));
    let daily = orders
        .confirm_client_payment_at(payment, per_day_booking(guest.id, vendor.id, "2024-06-10", "2024-06-14"), now)
        .await
        .unwrap();
    let payment = client_payment("order_2", "pay_2", Paise::from_rupees(4_500));
    orders.confirm_client_payment_at(payment, per_month_booking(guest.id, vendor.id, 1), now).await.unwrap();
    // A replayed confirmation changes nothing and publishes nothing
    let payment = client_payment("order_2", "pay_2", Paise::from_rupees(4_500));
    orders.confirm_client_payment_at(payment, per_month_booking(guest.id, vendor.id, 1), now).await.unwrap();

    orders.cancel_order_at(daily.order().id(), guest.id, civil_time(2024, 6, 13, 9, 0)).await.unwrap();
    payout_api.mark_payout_paid_at(daily.order().id(), civil_time(2024, 6, 13, 10, 0)).await.unwrap();

    assert_eq!(created.wait_for(2).await, 2);
    assert_eq!(referrals.wait_for(1).await, 1);
    assert_eq!(cancelled.wait_for(1).await, 1);
    assert_eq!(payouts.wait_for(1).await, 1);
    let amounts = referral_amounts.lock().unwrap().clone();
    assert_eq!(amounts, vec![("Meera".to_string(), Paise::from_rupees(100))]);

    db.close().await.unwrap();
    Sqlite::drop_database(db.url()).await.unwrap();
}
