//! Payment provider signatures.
//!
//! The provider signs two things with HMAC-SHA256, hex encoded:
//! * the client-side checkout confirmation, `"{provider_order_id}|{payment_id}"`, keyed with the API key secret;
//! * the raw body of every server-to-server callback, keyed with the webhook secret.
use hmac::{Hmac, Mac};
use log::{trace, warn};
use sha2::Sha256;
use tiffin_common::Secret;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `data`
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(data);
            hex::encode(mac.finalize().into_bytes())
        },
        Err(e) => {
            warn!("🔐️ Could not initialise HMAC. {e}");
            String::default()
        },
    }
}

/// Checks a hex-encoded signature in constant time
pub fn verify_hmac(secret: &str, data: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        trace!("🔐️ Signature is not valid hex");
        return false;
    };
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(data);
            mac.verify_slice(&expected).is_ok()
        },
        Err(_) => false,
    }
}

#[derive(Clone, Debug, Default)]
pub struct PaymentVerifier {
    key_secret: Secret<String>,
    webhook_secret: Secret<String>,
}

impl PaymentVerifier {
    pub fn new(key_secret: Secret<String>, webhook_secret: Secret<String>) -> Self {
        Self { key_secret, webhook_secret }
    }

    pub fn verify_client_payment(&self, provider_order_id: &str, payment_id: &str, signature: &str) -> bool {
        if self.key_secret.is_empty() {
            warn!("🔐️ No payment key secret is configured. Client payment confirmations cannot be verified.");
            return false;
        }
        let message = format!("{provider_order_id}|{payment_id}");
        verify_hmac(self.key_secret.reveal(), message.as_bytes(), signature)
    }

    pub fn verify_callback(&self, body: &[u8], signature: &str) -> bool {
        if self.webhook_secret.is_empty() {
            warn!("🔐️ No webhook secret is configured. Payment callbacks cannot be verified.");
            return false;
        }
        verify_hmac(self.webhook_secret.reveal(), body, signature)
    }

    /// Signs a client confirmation the way the provider does. Useful for tests and local tooling.
    pub fn sign_client_payment(&self, provider_order_id: &str, payment_id: &str) -> String {
        calculate_hmac(self.key_secret.reveal(), format!("{provider_order_id}|{payment_id}").as_bytes())
    }

    pub fn sign_callback(&self, body: &[u8]) -> String {
        calculate_hmac(self.webhook_secret.reveal(), body)
    }
}
