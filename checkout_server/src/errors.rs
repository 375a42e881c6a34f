use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use checkout_engine::traits::CheckoutError;
use razorpay_tools::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Payment signature is invalid or not provided")]
    InvalidSignature,
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
    #[error("Payment {0} has not been captured. Status: {1}")]
    PaymentNotCaptured(String, String),
    #[error("The payment has been refunded. {0}")]
    PaymentRefunded(String),
    #[error("Checkout error. {0}")]
    CheckoutError(#[from] CheckoutError),
    #[error("The payment gateway is unavailable. {0}")]
    GatewayUnavailable(String),
    #[error("The payment gateway rejected the request. {0}")]
    GatewayRejection(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentNotCaptured(_, _) => StatusCode::PAYMENT_REQUIRED,
            Self::PaymentRefunded(_) => StatusCode::CONFLICT,
            Self::CheckoutError(e) => match e {
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::AddressNotFound(_) => StatusCode::BAD_REQUEST,
                CheckoutError::VariantNotFound(_) => StatusCode::BAD_REQUEST,
                CheckoutError::CodNotAvailable(_) => StatusCode::BAD_REQUEST,
                CheckoutError::Pricing(_) => StatusCode::BAD_REQUEST,
                CheckoutError::OutOfStock(_) => StatusCode::CONFLICT,
                CheckoutError::PaymentStatusConflict(_) => StatusCode::CONFLICT,
                CheckoutError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::OrderIdNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayRejection(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<GatewayError> for ServerError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(m) => Self::GatewayUnavailable(m),
            GatewayError::Initialization(m) => Self::InitializeError(m),
            e => Self::GatewayRejection(e.to_string()),
        }
    }
}
