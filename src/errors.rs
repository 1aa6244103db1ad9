use crate::models::CheckoutResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types for the lookup and utility endpoints.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Route exists but not for this HTTP method.
    MethodNotAllowed,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::MethodNotAllowed => write!(f, "Method not allowed"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and a `{"error": ...}` body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method not allowed".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// HTTP status class of a failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    BadRequest,
    NotFound,
    PaymentDeclined,
    InternalError,
}

impl Severity {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Severity::BadRequest => StatusCode::BAD_REQUEST,
            Severity::NotFound => StatusCode::NOT_FOUND,
            Severity::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,
            Severity::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Postal (CEP) lookup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Input does not contain exactly 8 digits.
    InvalidFormat,
    /// Network error or non-200 response.
    ServiceUnavailable,
    /// Body could not be decoded.
    InvalidResponse,
    /// The service reported the postal code as unknown.
    NotFound,
}

impl LookupError {
    pub fn reason(&self) -> &'static str {
        match self {
            LookupError::InvalidFormat => "invalid postal code",
            LookupError::ServiceUnavailable => "postal lookup service unavailable",
            LookupError::InvalidResponse => "invalid response from postal lookup service",
            LookupError::NotFound => "postal code not found",
        }
    }

    /// Status class used by the standalone lookup endpoint.
    ///
    /// Upstream outages surface as "not found" there, matching what clients
    /// of the lookup endpoint have always observed.
    pub fn severity(&self) -> Severity {
        match self {
            LookupError::InvalidFormat => Severity::BadRequest,
            _ => Severity::NotFound,
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl std::error::Error for LookupError {}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err.severity() {
            Severity::BadRequest => AppError::BadRequest(err.to_string()),
            _ => AppError::NotFound(err.to_string()),
        }
    }
}

/// Persistence port failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No live connection to the order store.
    Unavailable(String),
    /// The insert itself failed.
    Query(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "order store unavailable: {}", msg),
            StoreError::Query(msg) => write!(f, "order insert failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// BIN lookup failures. Never terminal for a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinLookupError {
    TooShort,
    Request(String),
    InvalidResponse(String),
}

impl fmt::Display for BinLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinLookupError::TooShort => write!(f, "card number too short for BIN lookup"),
            BinLookupError::Request(msg) => write!(f, "BIN lookup request failed: {}", msg),
            BinLookupError::InvalidResponse(msg) => {
                write!(f, "BIN lookup returned invalid response: {}", msg)
            }
        }
    }
}

impl std::error::Error for BinLookupError {}

/// Terminal rejection of a checkout. The first failing stage wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Body is not a valid checkout payload.
    MalformedInput,
    /// A configured-required field is absent or blank.
    MissingField(&'static str),
    /// Postal lookup failed; surfaced to the client as a bad request.
    Address(LookupError),
    CardBrandUnknown,
    /// Simulated payment decline.
    PaymentFieldsInvalid,
    PersistenceUnavailable(String),
    PersistenceFailure(String),
}

impl CheckoutError {
    pub fn severity(&self) -> Severity {
        match self {
            CheckoutError::MalformedInput
            | CheckoutError::MissingField(_)
            | CheckoutError::Address(_)
            | CheckoutError::CardBrandUnknown => Severity::BadRequest,
            CheckoutError::PaymentFieldsInvalid => Severity::PaymentDeclined,
            CheckoutError::PersistenceUnavailable(_) | CheckoutError::PersistenceFailure(_) => {
                Severity::InternalError
            }
        }
    }

    /// Whether the simulated payment went through before the failure.
    pub fn payment_approved(&self) -> bool {
        matches!(
            self,
            CheckoutError::PersistenceUnavailable(_) | CheckoutError::PersistenceFailure(_)
        )
    }

    /// Client-facing message. Persistence details stay in the server log.
    pub fn message(&self) -> String {
        match self {
            CheckoutError::MalformedInput => "invalid payload".to_string(),
            CheckoutError::MissingField(field) => {
                format!("missing required field '{}'", field)
            }
            CheckoutError::Address(err) => err.reason().to_string(),
            CheckoutError::CardBrandUnknown => "unknown card brand".to_string(),
            CheckoutError::PaymentFieldsInvalid => "invalid CVV or expiration".to_string(),
            CheckoutError::PersistenceUnavailable(_) => {
                "payment approved, but failed to record order: order system unavailable"
                    .to_string()
            }
            CheckoutError::PersistenceFailure(_) => {
                "payment approved, but failed to record order".to_string()
            }
        }
    }
}

impl fmt::Display for CheckoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutError::PersistenceUnavailable(detail)
            | CheckoutError::PersistenceFailure(detail) => {
                write!(f, "{} ({})", self.message(), detail)
            }
            _ => f.write_str(&self.message()),
        }
    }
}

impl std::error::Error for CheckoutError {}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => CheckoutError::PersistenceUnavailable(msg),
            StoreError::Query(msg) => CheckoutError::PersistenceFailure(msg),
        }
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let status = self.severity().status_code();
        (status, Json(CheckoutResponse::rejected(self.message()))).into_response()
    }
}
