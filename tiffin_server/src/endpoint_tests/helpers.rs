use actix_web::{
    body,
    http::StatusCode,
    test,
    test::TestRequest,
    web::{self, ServiceConfig},
    App,
};
use log::debug;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tiffin_engine::{events::EventProducers, test_utils::seed::verifier, OrderFlowApi, SettlementDatabase, SqliteDatabase};

/// Sends `req` to an app configured by `configure`. Errors raised by middleware are rendered the way the server
/// would render them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1.map_into_boxed_body(),
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = body::to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned());
    (status, body.unwrap_or_default())
}

pub async fn post_json<F>(path: &str, body: serde_json::Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::post().uri(path).set_json(body), configure).await
}

/// An order flow API on `db` that verifies payments with the test secrets
pub fn order_flow_data(db: &SqliteDatabase, producers: EventProducers) -> web::Data<OrderFlowApi<SqliteDatabase>> {
    web::Data::new(OrderFlowApi::new(db.clone(), producers).with_verifier(verifier()))
}

pub async fn drop_database(mut db: SqliteDatabase) {
    db.close().await.unwrap();
    Sqlite::drop_database(db.url()).await.unwrap();
}
