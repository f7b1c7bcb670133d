use actix_web::{http::StatusCode, test::TestRequest, web};
use serde_json::{json, Value};
use tiffin_common::Paise;
use tiffin_engine::{events::EventProducers, test_utils::seed::*, SqliteDatabase};

use super::helpers::{drop_database, order_flow_data, post_json, send_request};
use crate::routes::{BookingsRoute, CancelOrderRoute, GuestOrdersRoute, OrderByIdRoute, QuoteRoute};

fn parse(body: &str) -> Value {
    serde_json::from_str(body).expect("Response body was not JSON")
}

#[actix_web::test]
async fn quote_previews_wallet_credit() {
    let _ = env_logger::try_init();
    let db = new_database().await;
    let vendor = create_vendor(&db, "Annapurna").await;
    let guest = create_guest(&db, "Asha", Paise::from_rupees(300)).await;
    let data = order_flow_data(&db, EventProducers::default());

    let body = serde_json::to_value(per_month_booking(guest.id, vendor.id, 1)).unwrap();
    let (status, body) = post_json("/quote", body, |cfg| {
        cfg.app_data(data).service(QuoteRoute::<SqliteDatabase>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let quote = parse(&body);
    assert_eq!(quote["total"], json!(450_000));
    assert_eq!(quote["amount_to_charge"], json!(420_000));
    drop_database(db).await;
}

#[actix_web::test]
async fn bookings_are_staged_or_confirmed() {
    let _ = env_logger::try_init();
    let db = new_database().await;
    let vendor = create_vendor(&db, "Annapurna").await;
    let guest = create_guest(&db, "Asha", Paise::zero()).await;
    let booking = serde_json::to_value(per_month_booking(guest.id, vendor.id, 1)).unwrap();
    let configure = |data: web::Data<_>| {
        move |cfg: &mut web::ServiceConfig| {
            cfg.app_data(data).service(BookingsRoute::<SqliteDatabase>::new());
        }
    };

    // Neither payment fields nor a provider order id
    let data = order_flow_data(&db, EventProducers::default());
    let (status, _) = post_json("/bookings", booking.clone(), configure(data)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut staged = booking.clone();
    staged["providerOrderId"] = json!("order_staged_1");
    let data = order_flow_data(&db, EventProducers::default());
    let (status, body) = post_json("/bookings", staged, configure(data)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(parse(&body)["provider_order_id"], json!("order_staged_1"));

    let mut paid = booking.clone();
    paid["payment"] = serde_json::to_value(client_payment("order_paid_1", "pay_1", Paise::from_rupees(4_500))).unwrap();
    let data = order_flow_data(&db, EventProducers::default());
    let (status, body) = post_json("/bookings", paid.clone(), configure(data)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let created = parse(&body);
    assert_eq!(created["result"], json!("created"));
    let order_id = created["order"]["id"].as_i64().unwrap();

    // The client retries the same payment
    let data = order_flow_data(&db, EventProducers::default());
    let (status, body) = post_json("/bookings", paid, configure(data)).await;
    assert_eq!(status, StatusCode::OK);
    let replay = parse(&body);
    assert_eq!(replay["result"], json!("already_exists"));
    assert_eq!(replay["order"]["id"].as_i64(), Some(order_id));

    let mut forged = booking;
    let mut payment = client_payment("order_paid_2", "pay_2", Paise::from_rupees(4_500));
    payment.signature = "00ff".into();
    forged["payment"] = serde_json::to_value(payment).unwrap();
    let data = order_flow_data(&db, EventProducers::default());
    let (status, _) = post_json("/bookings", forged, configure(data)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    drop_database(db).await;
}

#[actix_web::test]
async fn orders_can_be_fetched_and_cancelled_once() {
    let _ = env_logger::try_init();
    let db = new_database().await;
    let vendor = create_vendor(&db, "Annapurna").await;
    let guest = create_guest(&db, "Asha", Paise::zero()).await;
    let api = order_flow_data(&db, EventProducers::default());
    let payment = client_payment("order_c1", "pay_c1", Paise::from_rupees(4_500));
    let order_id = api.confirm_client_payment(payment, per_month_booking(guest.id, vendor.id, 1)).await.unwrap().order().id();

    let configure = |data: web::Data<_>| {
        move |cfg: &mut web::ServiceConfig| {
            cfg.app_data(data)
                .service(OrderByIdRoute::<SqliteDatabase>::new())
                .service(CancelOrderRoute::<SqliteDatabase>::new())
                .service(GuestOrdersRoute::<SqliteDatabase>::new());
        }
    };

    let req = TestRequest::get().uri(&format!("/orders/{order_id}"));
    let (status, body) = send_request(req, configure(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["status"], json!("Active"));

    let req = TestRequest::get().uri("/orders/9999");
    let (status, body) = send_request(req, configure(api.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(parse(&body)["error"].is_string());

    // Only the guest who booked can cancel
    let path = format!("/orders/{order_id}/cancel");
    let (status, _) = post_json(&path, json!({ "guestId": vendor.id }), configure(api.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = post_json(&path, json!({ "guestId": guest.id }), configure(api.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let outcome = parse(&body);
    assert_eq!(outcome["order"]["status"], json!("Cancelled"));
    assert!(outcome["settlement"]["refund"].as_i64().unwrap() > 0);

    let (status, _) = post_json(&path, json!({ "guestId": guest.id }), configure(api.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = TestRequest::get().uri(&format!("/guests/{}/orders", guest.id));
    let (status, body) = send_request(req, configure(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body).as_array().map(Vec::len), Some(1));
    drop_database(db).await;
}
