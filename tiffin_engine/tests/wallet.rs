use chrono::NaiveDate;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tiffin_common::Paise;
use tiffin_engine::{
    db_types::{NewUser, UserAccount},
    events::EventProducers,
    test_utils::seed::*,
    BirthdayBonusOutcome,
    OrderFlowApi,
    SettlementDatabase,
    SettlementError,
    SqliteDatabase,
    WalletApi,
    WalletManagement,
};

struct Apis {
    orders: OrderFlowApi<SqliteDatabase>,
    wallets: WalletApi<SqliteDatabase>,
    db: SqliteDatabase,
}

async fn setup() -> Apis {
    let db = new_database().await;
    Apis {
        orders: OrderFlowApi::new(db.clone(), EventProducers::default()).with_verifier(verifier()),
        wallets: WalletApi::new(db.clone()),
        db,
    }
}

async fn tear_down(mut apis: Apis) {
    apis.db.close().await.unwrap();
    Sqlite::drop_database(apis.db.url()).await.unwrap();
}

fn born_on_the_twelfth_of_june() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 6, 12).unwrap()
}

async fn create_birthday_guest(db: &SqliteDatabase, name: &str) -> UserAccount {
    let email = format!("{}@guest.example", name.to_lowercase());
    db.create_user(NewUser::guest(name, &email).with_dob(born_on_the_twelfth_of_june())).await.unwrap()
}

/// A one-month subscription that starts on the 9th of June 2024
async fn subscribe(apis: &Apis, guest_id: i64, vendor_id: i64) {
    let payment = client_payment("order_M", "pay_M", Paise::from_rupees(4_500));
    let booking = per_month_booking(guest_id, vendor_id, 1);
    apis.orders.confirm_client_payment_at(payment, booking, civil_time(2024, 6, 9, 9, 0)).await.unwrap();
}

#[tokio::test]
async fn birthday_bonus_is_granted_once() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let guest = create_birthday_guest(&apis.db, "Asha").await;
    subscribe(&apis, guest.id, vendor.id).await;

    let now = civil_time(2024, 6, 12, 8, 0);
    let outcome = apis.wallets.grant_birthday_bonus_at(guest.id, now).await.unwrap();
    match outcome {
        BirthdayBonusOutcome::Granted(wallet) => assert_eq!(wallet.credit_amount, Paise::from_rupees(100)),
        other => panic!("Expected the bonus to be granted, got {other:?}"),
    }
    let user = apis.db.fetch_user(guest.id).await.unwrap().unwrap();
    assert_eq!(user.birthday_bonus_at, Some(now));

    let later = civil_time(2024, 6, 12, 20, 0);
    let outcome = apis.wallets.grant_birthday_bonus_at(guest.id, later).await.unwrap();
    assert_eq!(outcome, BirthdayBonusOutcome::AlreadyGranted);
    assert_eq!(apis.wallets.wallet(guest.id).await.unwrap().credit_amount, Paise::from_rupees(100));
    tear_down(apis).await;
}

#[tokio::test]
async fn birthday_bonus_comes_back_every_calendar_year() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let guest = create_birthday_guest(&apis.db, "Asha").await;
    subscribe(&apis, guest.id, vendor.id).await;
    let late_last_year = civil_time(2024, 6, 12, 20, 0);
    let outcome = apis.wallets.grant_birthday_bonus_at(guest.id, late_last_year).await.unwrap();
    assert!(matches!(outcome, BirthdayBonusOutcome::Granted(_)));

    let payment = client_payment("order_M2", "pay_M2", Paise::from_rupees(4_500));
    let booking = per_month_booking(guest.id, vendor.id, 1);
    apis.orders.confirm_client_payment_at(payment, booking, civil_time(2025, 6, 9, 9, 0)).await.unwrap();
    // Less than 365 days after the last grant, but on this year's birthday
    let early_this_year = civil_time(2025, 6, 12, 8, 0);
    let outcome = apis.wallets.grant_birthday_bonus_at(guest.id, early_this_year).await.unwrap();
    assert!(matches!(outcome, BirthdayBonusOutcome::Granted(_)), "{outcome:?}");
    let user = apis.db.fetch_user(guest.id).await.unwrap().unwrap();
    assert_eq!(user.birthday_bonus_at, Some(early_this_year));

    let outcome = apis.wallets.grant_birthday_bonus_at(guest.id, civil_time(2025, 6, 12, 21, 0)).await.unwrap();
    assert_eq!(outcome, BirthdayBonusOutcome::AlreadyGranted);
    tear_down(apis).await;
}

#[tokio::test]
async fn birthday_bonus_needs_a_birthday_and_a_subscription() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let unsubscribed = create_birthday_guest(&apis.db, "Asha").await;
    let subscribed = create_birthday_guest(&apis.db, "Bilal").await;
    let no_dob = create_guest(&apis.db, "Chitra", Paise::default()).await;
    subscribe(&apis, subscribed.id, vendor.id).await;
    let birthday = civil_time(2024, 6, 12, 8, 0);

    let outcome = apis.wallets.grant_birthday_bonus_at(no_dob.id, birthday).await.unwrap();
    assert_eq!(outcome, BirthdayBonusOutcome::NoDateOfBirth);

    let outcome = apis.wallets.grant_birthday_bonus_at(unsubscribed.id, birthday).await.unwrap();
    assert_eq!(outcome, BirthdayBonusOutcome::NoActiveSubscription);

    let outcome = apis.wallets.grant_birthday_bonus_at(subscribed.id, civil_time(2024, 6, 13, 8, 0)).await.unwrap();
    assert_eq!(outcome, BirthdayBonusOutcome::NotBirthday);

    // 02:00 IST on the 12th is still the 11th in UTC, but it is the birthday in civil time
    let outcome = apis.wallets.grant_birthday_bonus_at(subscribed.id, civil_time(2024, 6, 12, 2, 0)).await.unwrap();
    assert!(matches!(outcome, BirthdayBonusOutcome::Granted(_)));

    let err = apis.wallets.grant_birthday_bonus_at(9_999, birthday).await.unwrap_err();
    assert_eq!(err, SettlementError::UserNotFound(9_999));
    tear_down(apis).await;
}

#[tokio::test]
async fn concurrent_birthday_bonus_is_granted_once() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let guest = create_birthday_guest(&apis.db, "Asha").await;
    subscribe(&apis, guest.id, vendor.id).await;

    let now = civil_time(2024, 6, 12, 8, 0);
    let (a, b) = tokio::join!(
        apis.wallets.grant_birthday_bonus_at(guest.id, now),
        apis.wallets.grant_birthday_bonus_at(guest.id, now)
    );
    let granted = [a.unwrap(), b.unwrap()].iter().filter(|o| matches!(o, BirthdayBonusOutcome::Granted(_))).count();
    assert_eq!(granted, 1);
    assert_eq!(apis.wallets.wallet(guest.id).await.unwrap().credit_amount, Paise::from_rupees(100));
    tear_down(apis).await;
}

#[tokio::test]
async fn wallet_lookups() {
    let apis = setup().await;
    let vendor = create_vendor(&apis.db, "Annapurna").await;
    let guest = create_guest(&apis.db, "Asha", Paise::from_rupees(250)).await;
    let wallet = apis.wallets.wallet(guest.id).await.unwrap();
    assert_eq!(wallet.credit_amount, Paise::from_rupees(250));
    assert!(!wallet.credit_consumed);
    assert!(apis.wallets.booked_vendors(guest.id).await.unwrap().is_empty());

    subscribe(&apis, guest.id, vendor.id).await;
    let wallet = apis.wallets.wallet(guest.id).await.unwrap();
    assert_eq!(wallet.credit_amount, Paise::default());
    assert!(wallet.credit_consumed);
    assert_eq!(apis.wallets.booked_vendors(guest.id).await.unwrap(), vec![vendor.id]);

    let err = apis.wallets.wallet(9_999).await.unwrap_err();
    assert_eq!(err, SettlementError::UserNotFound(9_999));
    tear_down(apis).await;
}
