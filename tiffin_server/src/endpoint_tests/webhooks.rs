use std::{
    sync::{mpsc, Arc},
    time::Duration,
};

use actix_web::{http::StatusCode, test::TestRequest};
use futures::future;
use serde_json::{json, Value};
use tiffin_common::Paise;
use tiffin_engine::{
    events::{EventHandlers, EventProducers},
    notifications::notification_hooks,
    test_utils::seed::*,
    OrderManagement,
    SettlementDatabase,
    SqliteDatabase,
};

use super::{
    helpers::{drop_database, order_flow_data, send_request},
    mocks::MockNotifier,
};
use crate::routes::{PaymentCallbackRoute, CALLBACK_SIGNATURE_HEADER};

fn callback_request(body: &str, signature: Option<&str>) -> TestRequest {
    let req = TestRequest::post()
        .uri("/payment")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    match signature {
        Some(sig) => req.insert_header((CALLBACK_SIGNATURE_HEADER, sig)),
        None => req,
    }
}

async fn send_callback(
    db: &SqliteDatabase,
    producers: EventProducers,
    body: &str,
    signature: Option<&str>,
) -> (StatusCode, Value) {
    let data = order_flow_data(db, producers);
    let (status, body) = send_request(callback_request(body, signature), |cfg| {
        cfg.app_data(data).service(PaymentCallbackRoute::<SqliteDatabase>::new());
    })
    .await;
    (status, serde_json::from_str(&body).unwrap_or(Value::Null))
}

#[actix_web::test]
async fn signed_callback_creates_the_staged_order() {
    let _ = env_logger::try_init();
    let db = new_database().await;
    let vendor = create_vendor(&db, "Annapurna").await;
    let guest = create_guest(&db, "Asha", Paise::zero()).await;

    let (tx, rx) = mpsc::channel();
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().returning(move |n| {
        let _ = tx.send((n.template, n.recipient.user_id));
        Box::pin(future::ready(Ok(())))
    });
    let handlers = EventHandlers::new(8, notification_hooks(Arc::new(notifier)));
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = order_flow_data(&db, EventProducers::default());
    api.stage_booking("order_cb_1", per_month_booking(guest.id, vendor.id, 1)).await.unwrap();

    let (body, signature) = captured_callback("pay_cb_1", "order_cb_1");
    let (status, outcome) = send_callback(&db, producers.clone(), &body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], json!("created"));
    let order_id = outcome["order_id"].as_i64().unwrap();

    let order = db.fetch_order_by_payment_id("pay_cb_1").await.unwrap().unwrap();
    assert_eq!(order.id(), order_id);
    assert!(db.fetch_staged_booking("order_cb_1").await.unwrap().is_none());

    // The provider retries the same callback
    let (status, outcome) = send_callback(&db, producers, &body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "outcome": "already_processed", "order_id": order_id }));

    let mut delivered = None;
    for _ in 0..50 {
        if let Ok(n) = rx.try_recv() {
            delivered = Some(n);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(delivered, Some(("order_created".to_string(), vendor.id)));
    assert!(rx.try_recv().is_err(), "A replayed callback must not notify again");
    drop_database(db).await;
}

#[actix_web::test]
async fn callbacks_we_do_not_act_on() {
    let _ = env_logger::try_init();
    let db = new_database().await;

    let body = json!({ "event": "payment.failed" }).to_string();
    let signature = verifier().sign_callback(body.as_bytes());
    let (status, outcome) = send_callback(&db, EventProducers::default(), &body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "outcome": "ignored", "event": "payment.failed" }));

    let (body, signature) = captured_callback("pay_cb_2", "order_nobody_staged");
    let (status, outcome) = send_callback(&db, EventProducers::default(), &body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], json!("no_staged_booking"));
    assert!(db.fetch_all_orders().await.unwrap().is_empty());
    drop_database(db).await;
}

#[actix_web::test]
async fn unsigned_callbacks_are_rejected() {
    let _ = env_logger::try_init();
    let db = new_database().await;
    let vendor = create_vendor(&db, "Annapurna").await;
    let guest = create_guest(&db, "Asha", Paise::zero()).await;
    let api = order_flow_data(&db, EventProducers::default());
    api.stage_booking("order_cb_3", per_month_booking(guest.id, vendor.id, 1)).await.unwrap();

    let (body, _) = captured_callback("pay_cb_3", "order_cb_3");
    let (status, outcome) = send_callback(&db, EventProducers::default(), &body, Some("deadbeef")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(outcome["error"].is_string());

    let (status, _) = send_callback(&db, EventProducers::default(), &body, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(db.fetch_all_orders().await.unwrap().is_empty());
    assert!(db.fetch_staged_booking("order_cb_3").await.unwrap().is_some());
    drop_database(db).await;
}

#[actix_web::test]
async fn callbacks_for_removed_vendors_are_acknowledged() {
    let _ = env_logger::try_init();
    let db = new_database().await;
    let vendor = create_vendor(&db, "Annapurna").await;
    let guest = create_guest(&db, "Asha", Paise::zero()).await;
    let api = order_flow_data(&db, EventProducers::default());
    api.stage_booking("order_cb_4", per_month_booking(guest.id, vendor.id, 1)).await.unwrap();
    delete_user(&db, vendor.id).await;

    let (body, signature) = captured_callback("pay_cb_4", "order_cb_4");
    let (status, outcome) = send_callback(&db, EventProducers::default(), &body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], json!("rejected"));
    assert_eq!(outcome["provider_order_id"], json!("order_cb_4"));
    assert_eq!(outcome["reason"], json!(format!("Vendor {} does not exist", vendor.id)));
    assert!(db.fetch_all_orders().await.unwrap().is_empty());
    drop_database(db).await;
}
