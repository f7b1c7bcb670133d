use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use tiffin_engine::{
    events::{EventHandlers, EventProducers},
    notifications::{notification_hooks, LogNotifier, Notifier},
    OrderFlowApi,
    PayoutApi,
    SqliteDatabase,
    WalletApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    middleware::AdminTokenMiddlewareFactory,
    notifier::HttpRelayNotifier,
    routes::{
        health,
        BirthdayBonusRoute,
        BookingsRoute,
        CancelOrderRoute,
        GuestOrdersRoute,
        MarkPayoutPaidRoute,
        OrderByIdRoute,
        PaymentCallbackRoute,
        PayoutSummaryRoute,
        QuoteRoute,
        VendorOrdersRoute,
        WalletRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let notifier = build_notifier(&config)?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks(notifier));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _worker = config
        .sweep_enabled
        .then(|| start_expiry_worker(db.clone(), config.sweep_interval, config.staged_booking_ttl));
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

fn build_notifier(config: &ServerConfig) -> Result<Arc<dyn Notifier>, ServerError> {
    match &config.notify_relay_url {
        Some(url) => {
            info!("📬️ Notifications will be relayed to {url}");
            let notifier = HttpRelayNotifier::new(url).map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
            Ok(Arc::new(notifier))
        },
        None => Ok(Arc::new(LogNotifier)),
    }
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let policy = config.policy();
    let clock = config.clock();
    let verifier = config.verifier();
    let admin_token = config.admin_token.clone();
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone())
            .with_clock(clock)
            .with_policy(policy)
            .with_verifier(verifier.clone());
        let wallet_api = WalletApi::new(db.clone()).with_clock(clock).with_policy(policy);
        let payout_api = PayoutApi::new(db.clone(), producers.clone()).with_policy(policy);
        let api_scope = web::scope("/api")
            .service(QuoteRoute::<SqliteDatabase>::new())
            .service(BookingsRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(GuestOrdersRoute::<SqliteDatabase>::new())
            .service(VendorOrdersRoute::<SqliteDatabase>::new())
            .service(WalletRoute::<SqliteDatabase>::new())
            .service(BirthdayBonusRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhooks").service(PaymentCallbackRoute::<SqliteDatabase>::new());
        let admin_scope = web::scope("/admin")
            .wrap(AdminTokenMiddlewareFactory::new(admin_token.clone()))
            .service(MarkPayoutPaidRoute::<SqliteDatabase>::new())
            .service(PayoutSummaryRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("tiffin::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(wallet_api))
            .app_data(web::Data::new(payout_api))
            .service(health)
            .service(api_scope)
            .service(webhook_scope)
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
