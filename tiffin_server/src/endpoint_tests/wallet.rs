use actix_web::{http::StatusCode, test::TestRequest, web};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use tiffin_common::Paise;
use tiffin_engine::{
    db_types::{UserAccount, UserType, Wallet},
    helpers::CivilClock,
    WalletApi,
};

use super::{helpers::send_request, mocks::MockWalletStore};
use crate::routes::{BirthdayBonusRoute, WalletRoute};

fn guest(id: i64, dob: Option<NaiveDate>) -> UserAccount {
    let now = Utc::now();
    UserAccount {
        id,
        name: "Asha".into(),
        email: "asha@guest.example".into(),
        phone: None,
        user_type: UserType::Guest,
        credit_amount: Paise::from_rupees(40),
        credit_consumed: false,
        referral_code: None,
        referred_by: None,
        referral_used: false,
        dob,
        birthday_bonus_at: None,
        birthday_penalty_at: None,
        price_per_day: Paise::zero(),
        price_per_month_single: Paise::zero(),
        price_per_month_both: Paise::zero(),
        order_count: 0,
        created_at: now,
        updated_at: now,
    }
}

/// A date of birth in a leap year that falls on today's civil date
fn birthday_today() -> NaiveDate {
    let today = CivilClock::default().civil_date(Utc::now());
    NaiveDate::from_ymd_opt(1992, today.month(), today.day()).unwrap()
}

fn birthday_elsewhere() -> NaiveDate {
    let other = CivilClock::default().civil_date(Utc::now()) - Duration::days(40);
    NaiveDate::from_ymd_opt(1992, other.month(), other.day()).unwrap()
}

async fn post_birthday_bonus(store: MockWalletStore, user_id: i64) -> (StatusCode, String) {
    let req = TestRequest::post().uri(&format!("/users/{user_id}/birthday_bonus"));
    send_request(req, |cfg| {
        cfg.app_data(web::Data::new(WalletApi::new(store))).service(BirthdayBonusRoute::<MockWalletStore>::new());
    })
    .await
}

#[actix_web::test]
async fn fetch_wallet() {
    let _ = env_logger::try_init();
    let mut store = MockWalletStore::new();
    store.expect_fetch_wallet().returning(|id| {
        Ok((id == 7).then(|| Wallet { user_id: 7, credit_amount: Paise::from_rupees(150), credit_consumed: true }))
    });
    let api = web::Data::new(WalletApi::new(store));

    let req = TestRequest::get().uri("/users/7/wallet");
    let (status, body) = send_request(req, |cfg| {
        cfg.app_data(api.clone()).service(WalletRoute::<MockWalletStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"user_id":7,"credit_amount":15000,"credit_consumed":true}"#);

    let req = TestRequest::get().uri("/users/8/wallet");
    let (status, _) = send_request(req, |cfg| {
        cfg.app_data(api).service(WalletRoute::<MockWalletStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn birthday_bonus_without_date_of_birth() {
    let _ = env_logger::try_init();
    let mut store = MockWalletStore::new();
    store.expect_fetch_user().returning(|id| Ok(Some(guest(id, None))));
    store.expect_has_active_monthly_order().never();
    store.expect_grant_birthday_bonus().never();
    let (status, body) = post_birthday_bonus(store, 3).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"result":"no_date_of_birth"}"#);
}

#[actix_web::test]
async fn birthday_bonus_on_another_day() {
    let _ = env_logger::try_init();
    let mut store = MockWalletStore::new();
    store.expect_fetch_user().returning(|id| Ok(Some(guest(id, Some(birthday_elsewhere())))));
    store.expect_grant_birthday_bonus().never();
    let (status, body) = post_birthday_bonus(store, 3).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"result":"not_birthday"}"#);
}

#[actix_web::test]
async fn birthday_bonus_needs_a_monthly_subscription() {
    let _ = env_logger::try_init();
    let mut store = MockWalletStore::new();
    store.expect_fetch_user().returning(|id| Ok(Some(guest(id, Some(birthday_today())))));
    store.expect_has_active_monthly_order().times(1).returning(|_, _| Ok(false));
    store.expect_grant_birthday_bonus().never();
    let (status, body) = post_birthday_bonus(store, 3).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"result":"no_active_subscription"}"#);
}

#[actix_web::test]
async fn birthday_bonus_is_granted() {
    let _ = env_logger::try_init();
    let mut store = MockWalletStore::new();
    store.expect_fetch_user().returning(|id| Ok(Some(guest(id, Some(birthday_today())))));
    store.expect_has_active_monthly_order().times(1).returning(|_, _| Ok(true));
    store
        .expect_grant_birthday_bonus()
        .withf(|id, amount, now, granted_before| {
            let clock = CivilClock::default();
            let year_start = clock.civil_date(*now).with_ordinal(1).unwrap();
            *id == 3 && *amount == Paise::from_rupees(100) && *granted_before == clock.civil_midnight(year_start)
        })
        .times(1)
        .returning(|id, amount, _, _| {
            Ok(Some(Wallet { user_id: id, credit_amount: Paise::from_rupees(40) + amount, credit_consumed: false }))
        });
    let (status, body) = post_birthday_bonus(store, 3).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"result":"granted","wallet":{"user_id":3,"credit_amount":14000,"credit_consumed":false}}"#
    );
}

#[actix_web::test]
async fn birthday_bonus_for_unknown_user() {
    let _ = env_logger::try_init();
    let mut store = MockWalletStore::new();
    store.expect_fetch_user().returning(|_| Ok(None));
    let (status, body) = post_birthday_bonus(store, 42).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("error"));
}
