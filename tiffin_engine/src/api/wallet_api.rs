use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{MealSelection, Wallet},
    helpers::CivilClock,
    settlement::{
        credit::{birthday_bonus_due, first_of_year},
        SettlementPolicy,
    },
    traits::{OrderManagement, SettlementError, WalletManagement},
};

/// The result of a birthday bonus evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "wallet", rename_all = "snake_case")]
pub enum BirthdayBonusOutcome {
    Granted(Wallet),
    NoDateOfBirth,
    NotBirthday,
    /// A bonus was already granted this civil year
    AlreadyGranted,
    /// Only guests with a running monthly subscription receive the bonus
    NoActiveSubscription,
}

#[derive(Clone)]
pub struct WalletApi<B> {
    db: B,
    clock: CivilClock,
    policy: SettlementPolicy,
}

impl<B: Debug> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, clock: CivilClock::default(), policy: SettlementPolicy::default() }
    }

    pub fn with_clock(mut self, clock: CivilClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: SettlementPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    pub async fn wallet(&self, user_id: i64) -> Result<Wallet, SettlementError> {
        self.db.fetch_wallet(user_id).await?.ok_or(SettlementError::UserNotFound(user_id))
    }

    pub async fn booked_vendors(&self, guest_id: i64) -> Result<Vec<i64>, SettlementError> {
        self.db.fetch_booked_vendors(guest_id).await
    }

    pub async fn meal_selections(&self, guest_id: i64) -> Result<Vec<MealSelection>, SettlementError> {
        self.db.fetch_meal_selections(guest_id).await
    }
}

impl<B> WalletApi<B>
where B: WalletManagement + OrderManagement
{
    /// See [`Self::grant_birthday_bonus_at`]
    pub async fn grant_birthday_bonus(&self, user_id: i64) -> Result<BirthdayBonusOutcome, SettlementError> {
        self.grant_birthday_bonus_at(user_id, Utc::now()).await
    }

    /// Grants the birthday bonus if today (in civil time) is the user's birthday, they have an active monthly
    /// subscription covering today, and no bonus was granted earlier in the civil year.
    ///
    /// The once-a-year gate is enforced again by the backend, so two concurrent calls grant the bonus once.
    pub async fn grant_birthday_bonus_at(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<BirthdayBonusOutcome, SettlementError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(SettlementError::UserNotFound(user_id))?;
        let Some(dob) = user.dob else {
            return Ok(BirthdayBonusOutcome::NoDateOfBirth);
        };
        let today = self.clock.civil_date(now);
        if !birthday_bonus_due(dob, today, None) {
            return Ok(BirthdayBonusOutcome::NotBirthday);
        }
        let last_granted = user.birthday_bonus_at.map(|at| self.clock.civil_date(at));
        if !birthday_bonus_due(dob, today, last_granted) {
            return Ok(BirthdayBonusOutcome::AlreadyGranted);
        }
        if !self.db.has_active_monthly_order(user_id, now).await? {
            trace!("💰️ User #{user_id} has no active monthly subscription. No birthday bonus.");
            return Ok(BirthdayBonusOutcome::NoActiveSubscription);
        }
        let amount = self.policy.birthday_bonus;
        let year_start = self.clock.civil_midnight(first_of_year(today));
        match self.db.grant_birthday_bonus(user_id, amount, now, year_start).await? {
            Some(wallet) => {
                info!("💰️ Birthday bonus of {amount} granted to user #{user_id}");
                Ok(BirthdayBonusOutcome::Granted(wallet))
            },
            None => Ok(BirthdayBonusOutcome::AlreadyGranted),
        }
    }
}
