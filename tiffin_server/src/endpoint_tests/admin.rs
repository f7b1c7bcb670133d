use actix_web::{http::StatusCode, test::TestRequest, web};
use serde_json::{json, Value};
use tiffin_common::{Paise, Secret};
use tiffin_engine::{events::EventProducers, test_utils::seed::*, PayoutApi, SqliteDatabase};

use super::helpers::{drop_database, order_flow_data, send_request};
use crate::{
    middleware::{AdminTokenMiddlewareFactory, ADMIN_TOKEN_HEADER},
    routes::{MarkPayoutPaidRoute, PayoutSummaryRoute},
};

const ADMIN_TOKEN: &str = "let-me-in";

async fn admin_request(db: &SqliteDatabase, req: TestRequest) -> (StatusCode, Value) {
    let data = web::Data::new(PayoutApi::new(db.clone(), EventProducers::default()));
    let (status, body) = send_request(req, |cfg| {
        cfg.app_data(data).service(
            web::scope("/admin")
                .wrap(AdminTokenMiddlewareFactory::new(Secret::new(ADMIN_TOKEN.to_string())))
                .service(MarkPayoutPaidRoute::<SqliteDatabase>::new())
                .service(PayoutSummaryRoute::<SqliteDatabase>::new()),
        );
    })
    .await;
    (status, serde_json::from_str(&body).unwrap_or(Value::Null))
}

fn with_token(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header((ADMIN_TOKEN_HEADER, token))
}

#[actix_web::test]
async fn admin_routes_need_the_token() {
    let _ = env_logger::try_init();
    let db = new_database().await;

    let (status, body) = admin_request(&db, TestRequest::get().uri("/admin/payouts")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let req = with_token(TestRequest::get().uri("/admin/payouts"), "let-me-out");
    let (status, _) = admin_request(&db, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = with_token(TestRequest::post().uri("/admin/orders/1/payout"), "");
    let (status, _) = admin_request(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = with_token(TestRequest::get().uri("/admin/payouts"), ADMIN_TOKEN);
    let (status, body) = admin_request(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    drop_database(db).await;
}

#[actix_web::test]
async fn monthly_payouts_are_marked_paid_in_turn() {
    let _ = env_logger::try_init();
    let db = new_database().await;
    let vendor = create_vendor(&db, "Annapurna").await;
    let guest = create_guest(&db, "Asha", Paise::zero()).await;
    let api = order_flow_data(&db, EventProducers::default());
    let payment = client_payment("order_adm_1", "pay_adm_1", Paise::from_rupees(4_500));
    let created = api.confirm_client_payment(payment, per_month_booking(guest.id, vendor.id, 1)).await.unwrap();
    let order_id = created.order().id();
    let path = format!("/admin/orders/{order_id}/payout");

    let (status, receipt) = admin_request(&db, with_token(TestRequest::post().uri(&path), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["payout"]["id"], json!("firstHalf"));
    assert_eq!(receipt["payout"]["status"], json!("paid"));

    let (status, receipt) = admin_request(&db, with_token(TestRequest::post().uri(&path), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["payout"]["id"], json!("final"));

    let (status, _) = admin_request(&db, with_token(TestRequest::post().uri(&path), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) =
        admin_request(&db, with_token(TestRequest::post().uri("/admin/orders/9999/payout"), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = with_token(TestRequest::get().uri("/admin/payouts"), ADMIN_TOKEN);
    let (status, summary) = admin_request(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary[0]["vendor_id"].as_i64(), Some(vendor.id));
    assert_eq!(summary[0]["total_share"], json!(405_000));
    assert_eq!(summary[0]["total_paid"], json!(405_000));
    assert_eq!(summary[0]["remaining"], json!(0));
    drop_database(db).await;
}
