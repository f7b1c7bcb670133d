mod civil_clock;
mod signatures;

pub use civil_clock::CivilClock;
pub use signatures::{calculate_hmac, verify_hmac, PaymentVerifier};
