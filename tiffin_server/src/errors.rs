use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use thiserror::Error;
use tiffin_engine::SettlementError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("The payment could not be verified. {0}")]
    PaymentRejected(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::PaymentRejected(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingAdminToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidAdminToken => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No admin token was provided.")]
    MissingAdminToken,
    #[error("The admin token is invalid.")]
    InvalidAdminToken,
}

impl From<SettlementError> for ServerError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::InvalidRange(_)
            | SettlementError::InvalidMealSelection(_)
            | SettlementError::InvalidModel(_)
            | SettlementError::InvalidQuantity(_)
            | SettlementError::InvalidPayload(_) => Self::InvalidRequestBody(e.to_string()),
            SettlementError::PaymentVerificationFailed
            | SettlementError::InvalidSignature
            | SettlementError::AmountMismatch { .. } => Self::PaymentRejected(e.to_string()),
            SettlementError::VendorNotFound(_) | SettlementError::UserNotFound(_) | SettlementError::NotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            SettlementError::AlreadyCancelled(_)
            | SettlementError::NoPendingPayout(_)
            | SettlementError::StagedBookingExists(_) => Self::Conflict(e.to_string()),
            SettlementError::DatabaseError(s) => {
                error!("💻️ Database error: {s}");
                Self::BackendError(format!("Database error: {s}"))
            },
        }
    }
}
