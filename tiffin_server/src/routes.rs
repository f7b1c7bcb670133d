//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use tiffin_engine::{
    order_objects::{CallbackOutcome, OrderCreationResult},
    settlement::BookingPayload,
    traits::{OrderManagement, SettlementDatabase, WalletManagement},
    OrderFlowApi,
    PayoutApi,
    WalletApi,
};

use crate::{
    data_objects::{BookingIntake, CancelRequest},
    errors::ServerError,
};

/// The header carrying the payment provider's callback signature
pub const CALLBACK_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Bookings  ----------------------------------------------------
route!(quote => Post "/quote" impl SettlementDatabase);
/// Route handler for the quote endpoint
///
/// Prices the booking in the body and previews how much of the guest's wallet credit a monthly order would use.
/// Nothing is stored.
pub async fn quote<B: SettlementDatabase>(
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<BookingPayload>,
) -> Result<HttpResponse, ServerError> {
    let payload = body.into_inner();
    debug!("💻️ POST quote for guest #{} with vendor #{}", payload.guest_id, payload.vendor_id);
    let quote = api.quote(payload).await?;
    Ok(HttpResponse::Ok().json(quote))
}

route!(bookings => Post "/bookings" impl SettlementDatabase);
/// Route handler for the booking intake endpoint
///
/// * If the body carries the provider's signed payment fields, the payment is verified and the order is created
///   immediately. A new order returns `201 Created`; a payment that was already turned into an order returns
///   `200 OK` with the existing order.
/// * Otherwise the body must name the provider order id. The booking is staged under it until the payment callback
///   arrives, and `202 Accepted` is returned with the quote.
pub async fn bookings<B: SettlementDatabase>(
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<BookingIntake>,
) -> Result<HttpResponse, ServerError> {
    let BookingIntake { booking, payment, provider_order_id } = body.into_inner();
    match (payment, provider_order_id) {
        (Some(payment), _) => {
            debug!("💻️ POST booking with payment {} for guest #{}", payment.payment_id, booking.guest_id);
            let result = api.confirm_client_payment(payment, booking).await?;
            match result {
                OrderCreationResult::Created(_) => Ok(HttpResponse::Created().json(result)),
                OrderCreationResult::AlreadyExists(_) => Ok(HttpResponse::Ok().json(result)),
            }
        },
        (None, Some(provider_order_id)) => {
            debug!("💻️ POST booking for guest #{} staged as {provider_order_id}", booking.guest_id);
            let staged = api.stage_booking(&provider_order_id, booking).await?;
            Ok(HttpResponse::Accepted().json(staged))
        },
        (None, None) => Err(ServerError::InvalidRequestBody(
            "A booking needs either the payment fields or the provider order id".into(),
        )),
    }
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{order_id}" impl SettlementDatabase);
pub async fn order_by_id<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order #{order_id}");
    let order = api.fetch_order(order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl SettlementDatabase);
/// Route handler for the cancellation endpoint
///
/// Cancels the order on behalf of the guest named in the body, and returns the settlement and the guest's wallet.
/// An order that was already cancelled returns `409 Conflict`.
pub async fn cancel_order<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<CancelRequest>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let guest_id = body.guest_id;
    info!("💻️ POST cancel order #{order_id} for guest #{guest_id}");
    let outcome = api.cancel_order(order_id, guest_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(guest_orders => Get "/guests/{guest_id}/orders" impl SettlementDatabase);
/// The guest's orders, newest first, each with a note on whether it can still be cancelled
pub async fn guest_orders<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let guest_id = path.into_inner();
    debug!("💻️ GET orders for guest #{guest_id}");
    let orders = api.orders_for_guest(guest_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(vendor_orders => Get "/vendors/{vendor_id}/orders" impl SettlementDatabase);
pub async fn vendor_orders<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let vendor_id = path.into_inner();
    debug!("💻️ GET orders for vendor #{vendor_id}");
    let orders = api.orders_for_vendor(vendor_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Wallets  ----------------------------------------------------
route!(wallet => Get "/users/{user_id}/wallet" impl WalletManagement);
pub async fn wallet<B: WalletManagement>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    debug!("💻️ GET wallet for user #{user_id}");
    let wallet = api.wallet(user_id).await?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(birthday_bonus => Post "/users/{user_id}/birthday_bonus" impl WalletManagement, OrderManagement);
/// Route handler for the birthday bonus endpoint
///
/// Evaluates, and if due grants, the user's birthday bonus. The response says which rule applied, so the client can
/// call this on every login without side effects beyond the first grant of the year.
pub async fn birthday_bonus<B: WalletManagement + OrderManagement>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    debug!("💻️ POST birthday bonus for user #{user_id}");
    let outcome = api.grant_birthday_bonus(user_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(payment_callback => Post "/payment" impl SettlementDatabase);
/// Route handler for the payment provider's callback
///
/// The signature is computed over the raw body, so the body is taken as bytes and only parsed after it has been
/// verified. Any callback that was verified returns `200 OK`, including ones that changed nothing, so the provider
/// stops retrying. A bad signature returns `400 Bad Request`.
pub async fn payment_callback<B: SettlementDatabase>(
    req: HttpRequest,
    api: web::Data<OrderFlowApi<B>>,
    body: web::Bytes,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received payment callback");
    let signature = req
        .headers()
        .get(CALLBACK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::PaymentRejected(format!("The {CALLBACK_SIGNATURE_HEADER} header is missing")))?;
    let outcome = api.process_payment_callback(body.as_ref(), signature).await?;
    match &outcome {
        CallbackOutcome::Created { order_id } => info!("💻️ Payment callback created order #{order_id}"),
        other => debug!("💻️ Payment callback handled: {other:?}"),
    }
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(mark_payout_paid => Post "/orders/{order_id}/payout" impl SettlementDatabase);
/// Route handler for vendor payout settlement
///
/// Marks the order's next pending payout as paid. Returns `409 Conflict` if every payout is already settled.
pub async fn mark_payout_paid<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️ POST payout for order #{order_id}");
    let receipt = api.mark_payout_paid(order_id).await?;
    Ok(HttpResponse::Ok().json(receipt))
}

route!(payout_summary => Get "/payouts" impl SettlementDatabase);
pub async fn payout_summary<B: SettlementDatabase>(api: web::Data<PayoutApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET payout summary");
    let summary = api.vendor_payout_summary().await?;
    Ok(HttpResponse::Ok().json(summary))
}
