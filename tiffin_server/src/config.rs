use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use tiffin_common::{parse_boolean_flag, Paise, Secret};
use tiffin_engine::{
    helpers::{CivilClock, PaymentVerifier},
    settlement::SettlementPolicy,
};

const DEFAULT_TIFFIN_HOST: &str = "127.0.0.1";
const DEFAULT_TIFFIN_PORT: u16 = 8370;
const DEFAULT_CIVIL_UTC_OFFSET_MINUTES: i32 = 330;
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Signs the payment fields the provider hands to the client after checkout
    pub payment_key_secret: Secret<String>,
    /// Signs the provider's server-to-server callbacks
    pub webhook_secret: Secret<String>,
    /// Admin routes require this value in the `X-Admin-Token` header
    pub admin_token: Secret<String>,
    /// The offset of the civil timezone used for dates and cut-offs, in minutes east of UTC
    pub civil_utc_offset_minutes: i32,
    /// Set to false on every instance but one when several servers share a database
    pub sweep_enabled: bool,
    pub sweep_interval: Duration,
    /// Staged bookings that were never paid for are purged after this long. `None` keeps them forever.
    pub staged_booking_ttl: Option<chrono::Duration>,
    /// If set, notifications are POSTed to this mail relay. Otherwise they are only logged.
    pub notify_relay_url: Option<String>,
    pub referral_bonus: Paise,
    pub birthday_bonus: Paise,
    pub birthday_penalty: Paise,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let policy = SettlementPolicy::default();
        Self {
            host: DEFAULT_TIFFIN_HOST.to_string(),
            port: DEFAULT_TIFFIN_PORT,
            database_url: String::default(),
            payment_key_secret: Secret::default(),
            webhook_secret: Secret::default(),
            admin_token: Secret::default(),
            civil_utc_offset_minutes: DEFAULT_CIVIL_UTC_OFFSET_MINUTES,
            sweep_enabled: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            staged_booking_ttl: None,
            notify_relay_url: None,
            referral_bonus: policy.referral_bonus,
            birthday_bonus: policy.birthday_bonus,
            birthday_penalty: policy.birthday_penalty,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("TIFFIN_HOST").ok().unwrap_or_else(|| DEFAULT_TIFFIN_HOST.into());
        let port = parse_env_or("TIFFIN_PORT", DEFAULT_TIFFIN_PORT);
        let database_url = env::var("TIFFIN_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TIFFIN_DATABASE_URL is not set. Please set it to the URL for the tiffin database.");
            String::default()
        });
        let payment_key_secret = secret_from_env("TIFFIN_PAYMENT_KEY_SECRET");
        let webhook_secret = secret_from_env("TIFFIN_WEBHOOK_SECRET");
        let admin_token = secret_from_env("TIFFIN_ADMIN_TOKEN");
        let mut civil_utc_offset_minutes =
            parse_env_or("TIFFIN_CIVIL_UTC_OFFSET_MINUTES", DEFAULT_CIVIL_UTC_OFFSET_MINUTES);
        if CivilClock::from_offset_minutes(civil_utc_offset_minutes).is_none() {
            error!(
                "🪛️ {civil_utc_offset_minutes} minutes is not a valid UTC offset. Using the default, \
                 {DEFAULT_CIVIL_UTC_OFFSET_MINUTES}, instead."
            );
            civil_utc_offset_minutes = DEFAULT_CIVIL_UTC_OFFSET_MINUTES;
        }
        let sweep_enabled = parse_boolean_flag(env::var("TIFFIN_SWEEP_ENABLED").ok(), true);
        if !sweep_enabled {
            info!("🪛️ TIFFIN_SWEEP_ENABLED is off. This instance will not remove expired orders.");
        }
        let sweep_interval =
            Duration::from_secs(parse_env_or("TIFFIN_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL.as_secs()).max(1));
        let staged_booking_ttl = env::var("TIFFIN_STAGED_BOOKING_TTL_HOURS")
            .ok()
            .and_then(|s| parse_or_warn::<i64>("TIFFIN_STAGED_BOOKING_TTL_HOURS", &s))
            .filter(|h| *h > 0)
            .map(chrono::Duration::hours);
        let notify_relay_url = env::var("TIFFIN_NOTIFY_RELAY_URL").ok().filter(|s| !s.trim().is_empty());
        if notify_relay_url.is_none() {
            info!("🪛️ TIFFIN_NOTIFY_RELAY_URL is not set. Notifications will only be logged.");
        }
        let referral_bonus = rupees_from_env("TIFFIN_REFERRAL_BONUS", defaults.referral_bonus);
        let birthday_bonus = rupees_from_env("TIFFIN_BIRTHDAY_BONUS", defaults.birthday_bonus);
        let birthday_penalty = rupees_from_env("TIFFIN_BIRTHDAY_PENALTY", defaults.birthday_penalty);
        Self {
            host,
            port,
            database_url,
            payment_key_secret,
            webhook_secret,
            admin_token,
            civil_utc_offset_minutes,
            sweep_enabled,
            sweep_interval,
            staged_booking_ttl,
            notify_relay_url,
            referral_bonus,
            birthday_bonus,
            birthday_penalty,
        }
    }

    /// The settlement policy, with the configured bonus and penalty amounts
    pub fn policy(&self) -> SettlementPolicy {
        SettlementPolicy {
            referral_bonus: self.referral_bonus,
            birthday_bonus: self.birthday_bonus,
            birthday_penalty: self.birthday_penalty,
            ..SettlementPolicy::default()
        }
    }

    pub fn clock(&self) -> CivilClock {
        CivilClock::from_offset_minutes(self.civil_utc_offset_minutes).unwrap_or_default()
    }

    pub fn verifier(&self) -> PaymentVerifier {
        PaymentVerifier::new(self.payment_key_secret.clone(), self.webhook_secret.clone())
    }
}

fn secret_from_env(name: &str) -> Secret<String> {
    let secret = Secret::new(env::var(name).unwrap_or_default());
    if secret.is_empty() {
        warn!("🪛️ {name} is not set. Requests that depend on it will be rejected.");
    }
    secret
}

fn parse_or_warn<T>(name: &str, value: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| error!("🪛️ {value} is not a valid value for {name}. {e}"))
        .ok()
}

fn parse_env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => parse_or_warn(name, &s).unwrap_or_else(|| {
            warn!("🪛️ Using the default for {name}, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

/// Reads a whole number of rupees. Negative amounts fall back to the default.
fn rupees_from_env(name: &str, default: Paise) -> Paise {
    match env::var(name) {
        Ok(s) => match parse_or_warn::<i64>(name, &s) {
            Some(r) if r >= 0 => Paise::from_rupees(r),
            _ => {
                warn!("🪛️ Using the default for {name}, {default}, instead.");
                default
            },
        },
        Err(_) => default,
    }
}
