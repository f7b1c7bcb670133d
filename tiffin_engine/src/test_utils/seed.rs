//! Users, bookings and signed payment fields for tests.
use chrono::{DateTime, NaiveDate, Utc};
use tiffin_common::{Paise, Secret};

use crate::{
    api::order_objects::ClientPayment,
    db_types::{NewUser, UserAccount, VendorPricing},
    helpers::{CivilClock, PaymentVerifier},
    settlement::BookingPayload,
    test_utils::{prepare_test_env, random_db_path},
    traits::WalletManagement,
    SqliteDatabase,
};

pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

/// A migrated database in a fresh file
pub async fn new_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database")
}

/// ₹100 a day, ₹2,500 a month for one meal and ₹4,500 a month for both
pub fn pricing() -> VendorPricing {
    VendorPricing {
        price_per_day: Paise::from_rupees(100),
        price_per_month_single: Paise::from_rupees(2_500),
        price_per_month_both: Paise::from_rupees(4_500),
    }
}

pub async fn create_vendor<B: WalletManagement>(db: &B, name: &str) -> UserAccount {
    let email = format!("{}@kitchen.example", name.to_lowercase());
    db.create_user(NewUser::vendor(name, &email, pricing())).await.expect("Error creating vendor")
}

pub async fn create_guest<B: WalletManagement>(db: &B, name: &str, credit: Paise) -> UserAccount {
    let email = format!("{}@guest.example", name.to_lowercase());
    let guest = NewUser::guest(name, &email).with_credit(credit).with_phone("9800000001");
    db.create_user(guest).await.expect("Error creating guest")
}

/// Removes a user that has no orders, as an operator would from the store directly
pub async fn delete_user(db: &SqliteDatabase, user_id: i64) {
    sqlx::query("DELETE FROM users WHERE id = $1").bind(user_id).execute(db.pool()).await.expect("Error deleting user");
}

pub fn verifier() -> PaymentVerifier {
    PaymentVerifier::new(Secret::new(KEY_SECRET.to_string()), Secret::new(WEBHOOK_SECRET.to_string()))
}

pub fn per_day_booking(guest_id: i64, vendor_id: i64, start: &str, end: &str) -> BookingPayload {
    BookingPayload {
        guest_id,
        vendor_id,
        subscription_model: "Per Day".into(),
        starting_date: Some(start.into()),
        ending_date: Some(end.into()),
        number_of_months: None,
        meal_types: vec!["lunch".into(), "dinner".into()],
        quantity: 1,
        name: "Asha Rao".into(),
        phone: "9800000001".into(),
        address: "14 Residency Road".into(),
    }
}

pub fn per_month_booking(guest_id: i64, vendor_id: i64, months: i64) -> BookingPayload {
    BookingPayload {
        subscription_model: "Per Month".into(),
        starting_date: None,
        ending_date: None,
        number_of_months: Some(months),
        ..per_day_booking(guest_id, vendor_id, "", "")
    }
}

/// Payment fields signed the way the provider's checkout signs them
pub fn client_payment(provider_order_id: &str, payment_id: &str, declared_total: Paise) -> ClientPayment {
    ClientPayment {
        provider_order_id: provider_order_id.to_string(),
        payment_id: payment_id.to_string(),
        signature: verifier().sign_client_payment(provider_order_id, payment_id),
        declared_total,
    }
}

/// A `payment.captured` callback body and its signature
pub fn captured_callback(payment_id: &str, provider_order_id: &str) -> (String, String) {
    let body = serde_json::json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": payment_id, "order_id": provider_order_id, "status": "captured" } } }
    })
    .to_string();
    let signature = verifier().sign_callback(body.as_bytes());
    (body, signature)
}

/// The UTC instant of a civil (IST) wall-clock time
pub fn civil_time(y: i32, m: u32, d: u32, hour: u32, min: u32) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(y, m, d).expect("Invalid date");
    let midnight = CivilClock::default().civil_midnight(date);
    midnight + chrono::Duration::minutes(i64::from(hour * 60 + min))
}
