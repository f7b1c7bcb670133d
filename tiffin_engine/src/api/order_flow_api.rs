use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use tiffin_common::Paise;

use crate::{
    api::order_objects::{
        CallbackOutcome,
        CancellationOutcome,
        ClientPayment,
        GuestOrderView,
        OrderCreationResult,
        PaymentCallback,
        QuoteResponse,
        StageBookingResponse,
    },
    db_types::{FullOrder, NewOrder, PaymentStatus, SubscriptionModel, UserAccount},
    events::{EventProducers, OrderCancelledEvent, OrderCreatedEvent, ReferralBonusEvent},
    helpers::{CivilClock, PaymentVerifier},
    settlement::{
        apply_credit,
        credit::{birthday_penalty_due, credit_applies, first_of_month},
        days_used,
        initial_payouts,
        order_dates,
        refund_payouts,
        schedule::cancel_window,
        settle_cancellation,
        BookingPayload,
        BookingRequest,
        CreditApplication,
        SettlementPolicy,
        SubscriptionTerms,
    },
    traits::{BirthdayPenalty, InsertOrderResult, OrderCancellation, SettlementDatabase, SettlementError},
};

/// `OrderFlowApi` is the primary API for handling bookings, payment confirmations and cancellations.
///
/// Orders can be created by two racing paths: the client confirming a payment it just made, and the payment provider's
/// callback. Both end in [`SettlementDatabase::insert_order`], which is idempotent on the payment id, so whichever
/// arrives second is a no-op.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    clock: CivilClock,
    policy: SettlementPolicy,
    verifier: PaymentVerifier,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self {
            db,
            producers,
            clock: CivilClock::default(),
            policy: SettlementPolicy::default(),
            verifier: PaymentVerifier::default(),
        }
    }

    pub fn with_clock(mut self, clock: CivilClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: SettlementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_verifier(mut self, verifier: PaymentVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn clock(&self) -> &CivilClock {
        &self.clock
    }

    pub fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: SettlementDatabase
{
    /// Prices a booking and previews how much of the guest's wallet credit it would use. Nothing is stored.
    pub async fn quote(&self, payload: BookingPayload) -> Result<QuoteResponse, SettlementError> {
        let request = payload.validate()?;
        self.quote_request(&request).await
    }

    /// Validates and prices a booking, and stages it under the provider's order id until the payment callback arrives.
    ///
    /// Returns the quote. The amount the provider should collect is [`QuoteResponse::amount_to_charge`].
    pub async fn stage_booking(
        &self,
        provider_order_id: &str,
        payload: BookingPayload,
    ) -> Result<StageBookingResponse, SettlementError> {
        let request = payload.validate()?;
        let quote = self.quote_request(&request).await?;
        self.db.stage_booking(provider_order_id, &request, quote.total).await?;
        info!(
            "🔄️📦️ Booking for guest #{} with vendor #{} staged as {provider_order_id}. Total {}, to charge {}",
            request.guest_id, request.vendor_id, quote.total, quote.amount_to_charge
        );
        Ok(StageBookingResponse { provider_order_id: provider_order_id.to_string(), quote })
    }

    /// See [`Self::confirm_client_payment_at`]
    pub async fn confirm_client_payment(
        &self,
        payment: ClientPayment,
        payload: BookingPayload,
    ) -> Result<OrderCreationResult, SettlementError> {
        self.confirm_client_payment_at(payment, payload, Utc::now()).await
    }

    /// The synchronous order path. The client presents the provider's signed payment fields together with the booking.
    ///
    /// * The signature over `"{provider_order_id}|{payment_id}"` must verify, else
    ///   [`SettlementError::PaymentVerificationFailed`].
    /// * The declared total must be within a paisa of either the amount to charge or the order total, else
    ///   [`SettlementError::AmountMismatch`].
    ///
    /// The booking staged under the same provider order id, if any, is deleted when the order is stored.
    pub async fn confirm_client_payment_at(
        &self,
        payment: ClientPayment,
        payload: BookingPayload,
        now: DateTime<Utc>,
    ) -> Result<OrderCreationResult, SettlementError> {
        if !self.verifier.verify_client_payment(&payment.provider_order_id, &payment.payment_id, &payment.signature) {
            warn!("🔄️💰️ Payment {} for {} failed verification", payment.payment_id, payment.provider_order_id);
            return Err(SettlementError::PaymentVerificationFailed);
        }
        let request = payload.validate()?;
        let quote = self.quote_request(&request).await?;
        let matches = |expected: Paise| (payment.declared_total - expected).value().abs() <= 1;
        if !matches(quote.amount_to_charge) && !matches(quote.total) {
            warn!(
                "🔄️💰️ Payment {} declares {} but the booking charges {} of {}",
                payment.payment_id, payment.declared_total, quote.amount_to_charge, quote.total
            );
            return Err(SettlementError::AmountMismatch {
                declared: payment.declared_total,
                charged: quote.amount_to_charge,
                total: quote.total,
            });
        }
        let order = self
            .build_new_order(&request, Some(payment.payment_id), Some(payment.provider_order_id), now)
            .await?;
        self.create_order(order).await
    }

    /// See [`Self::process_payment_callback_at`]
    pub async fn process_payment_callback(
        &self,
        body: &[u8],
        signature: &str,
    ) -> Result<CallbackOutcome, SettlementError> {
        self.process_payment_callback_at(body, signature, Utc::now()).await
    }

    /// The asynchronous order path, driven by the payment provider's server-to-server callback.
    ///
    /// The callback may be delivered more than once, and may race the client's own confirmation. Events other than
    /// `payment.captured` are ignored. If an order for the payment already exists, any leftover staged booking is
    /// cleared and nothing else happens. Otherwise the staged booking is turned into an order. Once the signature
    /// checks out, only a store failure is an error. A staged booking that cannot become an order is reported as
    /// [`CallbackOutcome::Rejected`].
    pub async fn process_payment_callback_at(
        &self,
        body: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<CallbackOutcome, SettlementError> {
        if !self.verifier.verify_callback(body, signature) {
            warn!("🔄️🪝️ Payment callback with an invalid signature was rejected");
            return Err(SettlementError::InvalidSignature);
        }
        let callback: PaymentCallback =
            serde_json::from_slice(body).map_err(|e| SettlementError::InvalidPayload(e.to_string()))?;
        if !callback.is_captured() {
            debug!("🔄️🪝️ Ignoring '{}' callback", callback.event);
            return Ok(CallbackOutcome::Ignored { event: callback.event });
        }
        let entity = callback
            .entity()
            .ok_or_else(|| SettlementError::InvalidPayload("The callback has no payment entity".into()))?;
        let payment_id = entity.id.clone();
        let provider_order_id = entity.order_id.clone();
        if let Some(existing) = self.db.fetch_order_by_payment_id(&payment_id).await? {
            self.db.delete_staged_booking(&provider_order_id).await?;
            debug!("🔄️🪝️ Payment {payment_id} was already processed as order #{}", existing.id());
            return Ok(CallbackOutcome::AlreadyProcessed { order_id: existing.id() });
        }
        let Some(staged) = self.db.fetch_staged_booking(&provider_order_id).await? else {
            info!("🔄️🪝️ Payment {payment_id} captured, but nothing is staged under {provider_order_id}");
            return Ok(CallbackOutcome::NoStagedBooking { provider_order_id });
        };
        let created = match self
            .build_new_order(staged.request(), Some(payment_id.clone()), Some(provider_order_id.clone()), now)
            .await
        {
            Ok(order) => self.create_order(order).await,
            Err(e) => Err(e),
        };
        match created {
            Ok(OrderCreationResult::Created(order)) => Ok(CallbackOutcome::Created { order_id: order.id() }),
            Ok(OrderCreationResult::AlreadyExists(order)) => {
                Ok(CallbackOutcome::AlreadyProcessed { order_id: order.id() })
            },
            Err(e @ SettlementError::DatabaseError(_)) => Err(e),
            Err(e) => {
                warn!("🔄️🪝️ Payment {payment_id} captured, but the booking staged under {provider_order_id} was rejected. {e}");
                Ok(CallbackOutcome::Rejected { provider_order_id, reason: e.to_string() })
            },
        }
    }

    /// See [`Self::cancel_order_at`]
    pub async fn cancel_order(&self, order_id: i64, guest_id: i64) -> Result<CancellationOutcome, SettlementError> {
        self.cancel_order_at(order_id, guest_id, Utc::now()).await
    }

    /// Cancels an active order on behalf of the guest who placed it.
    ///
    /// The used portion is priced at the vendor's current per-day rate for the civil days consumed so far. The guest
    /// is charged the cancellation penalty and the rest is refunded to their wallet. If the guest cancels in their
    /// birth month, on or after their birthday, the birthday penalty is deducted as well (once a month, and only if
    /// the balance covers it).
    pub async fn cancel_order_at(
        &self,
        order_id: i64,
        guest_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CancellationOutcome, SettlementError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .filter(|o| o.order.guest_id == guest_id)
            .ok_or(SettlementError::NotFound(order_id))?;
        if !order.order.is_active() {
            return Err(SettlementError::AlreadyCancelled(order_id));
        }
        let vendor = self.fetch_vendor(order.order.vendor_id).await?;
        let guest = self.db.fetch_user(guest_id).await?.ok_or(SettlementError::UserNotFound(guest_id))?;

        let days = days_used(order.order.starting_date, now, &self.clock, self.policy.same_day_cutoff_minutes);
        let settlement = settle_cancellation(
            order.order.total_amount,
            vendor.price_per_day,
            order.order.meal_types.meals_per_day(),
            order.order.quantity,
            days,
            &self.policy,
        );
        let birthday_penalty = self.birthday_penalty(&guest, now);
        let cancellation = OrderCancellation {
            order_id,
            guest_id,
            vendor_id: vendor.id,
            settlement,
            payouts: refund_payouts(settlement.refund, now),
            birthday_penalty,
            now,
        };
        let result = self.db.cancel_order(cancellation).await?;
        info!(
            "🔄️❌️ Order #{order_id} cancelled by guest #{guest_id}. {} days used ({}), penalty {}, refund {}",
            settlement.days_used, settlement.used_amount, settlement.penalty, settlement.refund
        );
        self.producers
            .publish_order_cancelled(OrderCancelledEvent::new(result.order.clone(), vendor.contact(), settlement))
            .await;
        Ok(CancellationOutcome {
            order: result.order,
            settlement,
            wallet: result.wallet,
            birthday_penalty: result.birthday_penalty,
        })
    }

    pub async fn fetch_order(&self, order_id: i64) -> Result<FullOrder, SettlementError> {
        self.db.fetch_order(order_id).await?.ok_or(SettlementError::NotFound(order_id))
    }

    /// See [`Self::orders_for_guest_at`]
    pub async fn orders_for_guest(&self, guest_id: i64) -> Result<Vec<GuestOrderView>, SettlementError> {
        self.orders_for_guest_at(guest_id, Utc::now()).await
    }

    /// The guest's orders, newest first, each annotated with whether it is still within its cancellation window.
    pub async fn orders_for_guest_at(
        &self,
        guest_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<GuestOrderView>, SettlementError> {
        let orders = self.db.fetch_orders_for_guest(guest_id).await?;
        let views = orders
            .into_iter()
            .map(|order| {
                let (cancel_allowed, note) =
                    cancel_window(order.order.is_active(), order.order.starting_date, now, &self.policy);
                GuestOrderView { order, cancel_allowed, note }
            })
            .collect();
        Ok(views)
    }

    pub async fn orders_for_vendor(&self, vendor_id: i64) -> Result<Vec<FullOrder>, SettlementError> {
        self.db.fetch_orders_for_vendor(vendor_id).await
    }

    async fn quote_request(&self, request: &BookingRequest) -> Result<QuoteResponse, SettlementError> {
        let vendor = self.fetch_vendor(request.vendor_id).await?;
        let total = request.quote(&vendor.pricing())?;
        let guest = self.db.fetch_user(request.guest_id).await?.ok_or(SettlementError::UserNotFound(request.guest_id))?;
        let credit = self.credit_preview(&guest, request.model(), total);
        trace!("🔄️💰️ Quote for guest #{}: {total}, credit preview {credit:?}", guest.id);
        Ok(QuoteResponse { subscription_model: request.model(), total, credit, amount_to_charge: credit.charged })
    }

    fn credit_preview(&self, guest: &UserAccount, model: SubscriptionModel, total: Paise) -> CreditApplication {
        if credit_applies(model) {
            apply_credit(guest.credit_amount, total)
        } else {
            CreditApplication::none(guest.credit_amount, total)
        }
    }

    async fn fetch_vendor(&self, vendor_id: i64) -> Result<UserAccount, SettlementError> {
        self.db
            .fetch_user(vendor_id)
            .await?
            .filter(UserAccount::is_vendor)
            .ok_or(SettlementError::VendorNotFound(vendor_id))
    }

    fn birthday_penalty(&self, guest: &UserAccount, now: DateTime<Utc>) -> Option<BirthdayPenalty> {
        let dob = guest.dob?;
        let today = self.clock.civil_date(now);
        if !birthday_penalty_due(dob, today) {
            return None;
        }
        let not_since = self.clock.civil_midnight(first_of_month(today));
        Some(BirthdayPenalty { amount: self.policy.birthday_penalty, not_since })
    }

    /// Prices and schedules an order from the vendor's current pricing. Shared by both order paths.
    async fn build_new_order(
        &self,
        request: &BookingRequest,
        payment_id: Option<String>,
        provider_order_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<NewOrder, SettlementError> {
        let vendor = self.fetch_vendor(request.vendor_id).await?;
        let total = request.quote(&vendor.pricing())?;
        let model = request.model();
        let dates = order_dates(&request.terms, now, &self.clock, &self.policy)?;
        let number_of_months = match request.terms {
            SubscriptionTerms::PerMonth { number_of_months } => Some(number_of_months),
            SubscriptionTerms::PerDay { .. } => None,
        };
        Ok(NewOrder {
            payment_id,
            provider_order_id,
            guest_id: request.guest_id,
            vendor_id: vendor.id,
            name: request.name.clone(),
            phone: request.phone.clone(),
            address: request.address.clone(),
            subscription_model: model,
            quantity: request.quantity,
            meal_types: request.meal_types.clone(),
            starting_date: dates.starting_date,
            ending_date: dates.ending_date,
            number_of_months,
            total_amount: total,
            vendor_share: self.policy.vendor_share(total),
            payment_status: PaymentStatus::Paid,
            expire_at: dates.expire_at,
            payouts: initial_payouts(model, total, &dates),
            referral_bonus: (model == SubscriptionModel::PerMonth).then_some(self.policy.referral_bonus),
        })
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderCreationResult, SettlementError> {
        let payment_id = order.payment_id.clone().unwrap_or_default();
        match self.db.insert_order(order).await? {
            InsertOrderResult::AlreadyExists(existing) => {
                debug!("🔄️📦️ Payment {payment_id} already produced order #{}", existing.id());
                Ok(OrderCreationResult::AlreadyExists(existing))
            },
            InsertOrderResult::Inserted(insertion) => {
                info!(
                    "🔄️📦️ Order #{} created for payment {payment_id}. Total {}, credit used {}",
                    insertion.order.id(),
                    insertion.order.order.total_amount,
                    insertion.credit.credit_used
                );
                self.producers
                    .publish_order_created(OrderCreatedEvent::new(insertion.order.clone(), insertion.vendor.clone()))
                    .await;
                if let Some(referral) = &insertion.referral {
                    let event = ReferralBonusEvent::new(
                        referral.referrer.clone(),
                        insertion.order.order.name.clone(),
                        referral.amount,
                    );
                    self.producers.publish_referral_bonus(event).await;
                }
                Ok(insertion.into())
            },
        }
    }
}
