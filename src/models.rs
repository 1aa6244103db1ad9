use crate::card::{mask_card_number, CardBrand};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Status recorded for every order that passes the simulated payment.
pub const ORDER_STATUS_APPROVED: &str = "APPROVED";

// ============================================================================
// Postal lookup
// ============================================================================

/// Address returned by the postal lookup service.
///
/// Field names on the wire follow the ViaCEP payload so the same type
/// decodes the upstream response and is returned to clients unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Postal code (CEP), as formatted by the service.
    #[serde(rename = "cep", default)]
    pub postal_code: String,
    /// Street name.
    #[serde(rename = "logradouro", default)]
    pub street: String,
    /// Neighborhood.
    #[serde(rename = "bairro", default)]
    pub neighborhood: String,
    /// City.
    #[serde(rename = "localidade", default)]
    pub city: String,
    /// Two-letter state code.
    #[serde(rename = "uf", default)]
    pub state: String,
    /// Set by the service when the postal code does not exist.
    #[serde(
        rename = "erro",
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "is_false"
    )]
    pub not_found: bool,
}

impl Address {
    /// Trims every text field.
    pub fn normalized(self) -> Self {
        Self {
            postal_code: self.postal_code.trim().to_string(),
            street: self.street.trim().to_string(),
            neighborhood: self.neighborhood.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_uppercase(),
            not_found: self.not_found,
        }
    }

    /// Flattened single-line address stored on an order.
    pub fn address_line(&self, number: &str) -> String {
        format!(
            "{}, {} - {}. {} - {}",
            self.street,
            number.trim(),
            self.neighborhood,
            self.city,
            self.state
        )
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// ViaCEP has reported the marker both as `true` and as `"true"`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
    })
}

/// Body of `POST /api/lookup-cep`.
#[derive(Debug, Deserialize)]
pub struct LookupCepRequest {
    pub cep: String,
}

// ============================================================================
// Checkout
// ============================================================================

/// Body of `POST /api/checkout`.
///
/// Absent and `null` fields decode as empty strings; presence rules are
/// enforced by the pipeline. Card data never leaves the request handling.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutRequest {
    #[serde(deserialize_with = "nullable_string")]
    pub card_number: String,
    #[serde(deserialize_with = "nullable_string")]
    pub card_holder: String,
    #[serde(rename = "expiration_date", deserialize_with = "nullable_string")]
    pub expiration: String,
    #[serde(deserialize_with = "nullable_string")]
    pub cvv: String,
    #[serde(deserialize_with = "nullable_string")]
    pub cep: String,
    #[serde(deserialize_with = "nullable_string")]
    pub number: String,
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl fmt::Debug for CheckoutRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutRequest")
            .field("card_number", &mask_card_number(&self.card_number))
            .field("card_holder", &self.card_holder)
            .field("expiration", &"[REDACTED]")
            .field("cvv", &"[REDACTED]")
            .field("cep", &self.cep)
            .field("number", &self.number)
            .finish()
    }
}

/// Response body of `POST /api/checkout`, for both outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_brand: Option<CardBrand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_info: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
}

impl CheckoutResponse {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            card_brand: None,
            address_info: None,
            order_id: None,
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

/// Order data handed to the persistence port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub card_holder: String,
    pub card_brand: CardBrand,
    pub address_line: String,
    pub status: String,
}

/// Persisted order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub card_holder: String,
    pub card_brand: String,
    pub address_line: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Utility endpoints
// ============================================================================

/// Body of `POST /api/validate-card`.
#[derive(Debug, Deserialize)]
pub struct ValidateCardRequest {
    pub card_number: String,
    #[serde(default, rename = "expiration_date")]
    pub expiration: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateCardResponse {
    pub valid: bool,
    pub card_brand: CardBrand,
    pub masked: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_valid: Option<bool>,
}

/// Body of `POST /api/validate-cpf`.
#[derive(Debug, Deserialize)]
pub struct ValidateCpfRequest {
    pub cpf: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateCpfResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
