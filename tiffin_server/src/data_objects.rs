use serde::{Deserialize, Serialize};
use tiffin_engine::{order_objects::ClientPayment, settlement::BookingPayload};

/// The body of a booking request.
///
/// A booking arrives in one of two shapes. If the client already holds the provider's signed payment fields, they
/// are sent in `payment` and the order is created straight away. Otherwise `providerOrderId` names the order the
/// provider created for this checkout, and the booking is staged until the provider's callback confirms the payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingIntake {
    #[serde(flatten)]
    pub booking: BookingPayload,
    #[serde(default)]
    pub payment: Option<ClientPayment>,
    #[serde(default)]
    pub provider_order_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub guest_id: i64,
}
