use chrono::{Duration, Utc};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tiffin_common::Paise;
use tiffin_engine::{
    db_types::{FullOrder, OrderStatusType, PaymentStatus, PayoutStage, PayoutStatus},
    events::EventProducers,
    test_utils::seed::*,
    traits::{RemovalReason, RemovedOrder},
    ExpiryApi,
    OrderFlowApi,
    OrderManagement,
    PayoutApi,
    SettlementDatabase,
    SettlementError,
    SqliteDatabase,
};

struct Apis {
    orders: OrderFlowApi<SqliteDatabase>,
    payouts: PayoutApi<SqliteDatabase>,
    expiry: ExpiryApi<SqliteDatabase>,
    db: SqliteDatabase,
}

async fn setup() -> Apis {
    let db = new_database().await;
    Apis {
        orders: OrderFlowApi::new(db.clone(), EventProducers::default()).with_verifier(verifier()),
        payouts: PayoutApi::new(db.clone(), EventProducers::default()),
        expiry: ExpiryApi::new(db.clone()),
        db,
    }
}

async fn tear_down(mut apis: Apis) {
    apis.db.close().await.unwrap();
    Sqlite::drop_database(apis.db.url()).await.unwrap();
}

fn rupees(r: i64) -> Paise {
    Paise::from_rupees(r)
}

async fn monthly_order(apis: &Apis, guest_id: i64, vendor_id: i64, tag: &str) -> FullOrder {
    let payment = client_payment(&format!("order_{tag}"), &format!("pay_{tag}"), rupees(4_500));
    let booking = per_month_booking(guest_id, vendor_id, 1);
    let result = apis.orders.confirm_client_payment_at(payment, booking, civil_time(2024, 6, 9, 9, 0)).await.unwrap();
    result.order().clone()
}

async fn daily_order(apis: &Apis, guest_id: i64, vendor_id: i64, tag: &str) -> FullOrder {
    let payment = client_payment(&format!("order_{tag}"), &format!("pay_{tag}"), rupees(1_000));
    let booking = per_day_booking(guest_id, vendor_id, "2024-06-10", "2024-06-14");
    let result = apis.orders.confirm_client_payment_at(payment, booking, civil_time(2024, 6, 9, 9, 0)).await.unwrap();
    result.order().clone()
}

#[tokio::test]
async fn monthly_payouts_are_settled_in_order() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let guest = create_guest(&apis.db, "Asha", Paise::default()).await;
    let order = monthly_order(&apis, guest.id, vendor.id, "A").await;
    let ending_date = order.order.ending_date;

    let now = civil_time(2024, 6, 10, 10, 0);
    let receipt = apis.payouts.mark_payout_paid_at(order.id(), now).await.unwrap();
    assert_eq!(receipt.payout.stage, PayoutStage::FirstHalf);
    assert_eq!(receipt.payout.status, PayoutStatus::Paid);
    assert_eq!(receipt.payout.paid_on, Some(now));
    assert_eq!(receipt.order.order.payment_status, PaymentStatus::Paid);
    assert_eq!(receipt.order.order.to_be_deleted_at, Some(ending_date + Duration::days(2)));
    assert_eq!(receipt.order.next_pending_payout().map(|p| p.stage), Some(PayoutStage::Final));

    let later = civil_time(2024, 7, 9, 10, 0);
    let receipt = apis.payouts.mark_payout_paid_at(order.id(), later).await.unwrap();
    assert_eq!(receipt.payout.stage, PayoutStage::Final);
    assert!(receipt.order.payouts.iter().all(|p| p.status == PayoutStatus::Paid));

    let before = apis.db.fetch_order(order.id()).await.unwrap().unwrap();
    let err = apis.payouts.mark_payout_paid_at(order.id(), later).await.unwrap_err();
    assert_eq!(err, SettlementError::NoPendingPayout(order.id()));
    assert_eq!(apis.db.fetch_order(order.id()).await.unwrap().unwrap(), before);

    let err = apis.payouts.mark_payout_paid_at(9_999, later).await.unwrap_err();
    assert_eq!(err, SettlementError::NotFound(9_999));
    tear_down(apis).await;
}

#[tokio::test]
async fn daily_orders_are_kept_two_days_after_settlement() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let guest = create_guest(&apis.db, "Asha", Paise::default()).await;
    let order = daily_order(&apis, guest.id, vendor.id, "A").await;
    let now = civil_time(2024, 6, 11, 10, 0);
    let receipt = apis.payouts.mark_payout_paid_at(order.id(), now).await.unwrap();
    assert_eq!(receipt.payout.stage, PayoutStage::Full);
    assert_eq!(receipt.order.order.to_be_deleted_at, Some(now + Duration::days(2)));
    tear_down(apis).await;
}

#[tokio::test]
async fn cancelled_orders_settle_the_refund() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let guest = create_guest(&apis.db, "Asha", Paise::default()).await;
    let order = daily_order(&apis, guest.id, vendor.id, "A").await;
    let now = civil_time(2024, 6, 13, 9, 0);
    apis.orders.cancel_order_at(order.id(), guest.id, now).await.unwrap();
    let receipt = apis.payouts.mark_payout_paid_at(order.id(), now).await.unwrap();
    assert_eq!(receipt.payout.stage, PayoutStage::Refunded);
    assert_eq!(receipt.payout.amount, rupees(380));
    assert_eq!(receipt.order.order.status, OrderStatusType::Cancelled);
    tear_down(apis).await;
}

#[tokio::test]
async fn vendor_summary_counts_paid_shares() {
    let apis = setup().await;
    let annapurna = create_vendor(&apis.db, "Annapurna").await;
    let dabba = create_vendor(&apis.db, "Dabba").await;
    let guest = create_guest(&apis.db, "Asha", Paise::default()).await;
    let paid = daily_order(&apis, guest.id, annapurna.id, "A").await;
    daily_order(&apis, guest.id, annapurna.id, "B").await;
    monthly_order(&apis, guest.id, dabba.id, "C").await;
    apis.payouts.mark_payout_paid_at(paid.id(), civil_time(2024, 6, 10, 9, 0)).await.unwrap();

    let summary = apis.payouts.vendor_payout_summary().await.unwrap();
    assert_eq!(summary.len(), 2);
    let first = &summary[0];
    assert_eq!(first.vendor_id, annapurna.id);
    assert_eq!(first.vendor_name, "Annapurna");
    assert_eq!(first.total_share, rupees(1_800));
    assert_eq!(first.total_paid, rupees(900));
    assert_eq!(first.remaining, rupees(900));
    assert_eq!(first.orders.len(), 2);
    let second = &summary[1];
    assert_eq!(second.total_share, rupees(4_050));
    assert_eq!(second.total_paid, Paise::default());
    // Monthly vendors are paid a week after the start
    assert_eq!(second.orders[0].due_date, civil_time(2024, 6, 9, 0, 0) + Duration::days(7));
    tear_down(apis).await;
}

#[tokio::test]
async fn sweep_removes_expired_and_settled_orders() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let guest = create_guest(&apis.db, "Asha", Paise::default()).await;
    let expiring = daily_order(&apis, guest.id, vendor.id, "A").await;
    let settled = daily_order(&apis, guest.id, vendor.id, "B").await;
    let monthly = monthly_order(&apis, guest.id, vendor.id, "C").await;
    apis.payouts.mark_payout_paid_at(settled.id(), civil_time(2024, 6, 11, 10, 0)).await.unwrap();

    let result = apis.expiry.sweep(civil_time(2024, 6, 13, 9, 0)).await.unwrap();
    assert!(result.is_empty());

    // Two days after settlement
    let result = apis.expiry.sweep(civil_time(2024, 6, 13, 10, 0)).await.unwrap();
    assert_eq!(result.removed, vec![RemovedOrder { order_id: settled.id(), reason: RemovalReason::Settled }]);
    assert!(apis.db.fetch_order(settled.id()).await.unwrap().is_none());

    let result = apis.expiry.sweep(civil_time(2024, 6, 14, 23, 59)).await.unwrap();
    assert!(result.removed.is_empty());
    let result = apis.expiry.sweep(civil_time(2024, 6, 15, 0, 0)).await.unwrap();
    assert_eq!(result.removed, vec![RemovedOrder { order_id: expiring.id(), reason: RemovalReason::Expired }]);
    assert_eq!(result.count(RemovalReason::Expired), 1);

    let remaining = apis.db.fetch_all_orders().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id(), monthly.id());
    assert_eq!(remaining[0].payouts.len(), 2);
    tear_down(apis).await;
}

#[tokio::test]
async fn stale_staged_bookings_are_purged_when_configured() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let guest = create_guest(&apis.db, "Asha", Paise::default()).await;
    apis.orders.stage_booking("order_S", per_month_booking(guest.id, vendor.id, 1)).await.unwrap();

    let later = Utc::now() + Duration::hours(2);
    let result = apis.expiry.sweep(later).await.unwrap();
    assert_eq!(result.staged_bookings_purged, 0);
    assert!(apis.db.fetch_staged_booking("order_S").await.unwrap().is_some());

    let expiry = ExpiryApi::new(apis.db.clone()).with_staged_booking_ttl(Some(Duration::hours(1)));
    let result = expiry.sweep(later).await.unwrap();
    assert_eq!(result.staged_bookings_purged, 1);
    assert!(apis.db.fetch_staged_booking("order_S").await.unwrap().is_none());
    tear_down(apis).await;
}
