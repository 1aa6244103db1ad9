use crate::card::{classify_card, mask_card_number};
use crate::cep_client::PostalLookup;
use crate::checkout::CheckoutPipeline;
use crate::errors::{AppError, CheckoutError};
use crate::models::*;
use crate::validators::{luhn_valid, validate_cpf as check_cpf, validate_expiration};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Postal lookup used by the standalone CEP endpoint.
    pub postal: Arc<dyn PostalLookup>,
    /// Checkout validation pipeline.
    pub pipeline: Arc<CheckoutPipeline>,
}

/// API routes, without the transport middleware added by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/lookup-cep",
            post(lookup_cep).fallback(method_not_allowed),
        )
        .route(
            "/api/checkout",
            post(checkout).fallback(checkout_method_not_allowed),
        )
        .route(
            "/api/validate-card",
            post(validate_card).fallback(method_not_allowed),
        )
        .route(
            "/api/validate-cpf",
            post(validate_cpf).fallback(method_not_allowed),
        )
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-checkout-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/lookup-cep
///
/// Resolves a postal code to an address.
///
/// # Returns
///
/// * `200` with the address, `400` for a malformed body or postal code,
///   `404` when the code cannot be resolved.
pub async fn lookup_cep(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Address>, AppError> {
    let req: LookupCepRequest = parse_json(&body)?;
    tracing::info!("POST /lookup-cep - cep: {}", req.cep);

    let address = state.postal.lookup(&req.cep).await?;
    Ok(Json(address))
}

/// POST /api/checkout
///
/// Runs the checkout pipeline. Rejections carry `{success: false, message}`
/// with 400, 402 or 500.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CheckoutResponse>, CheckoutError> {
    let approval = state.pipeline.process(&body).await?;
    Ok(Json(approval.into()))
}

/// POST /api/validate-card
///
/// Luhn and brand check, independent of the checkout brand gate.
pub async fn validate_card(body: Bytes) -> Result<Json<ValidateCardResponse>, AppError> {
    let req: ValidateCardRequest = parse_json(&body)?;
    let today = Utc::now().date_naive();

    Ok(Json(ValidateCardResponse {
        valid: luhn_valid(&req.card_number),
        card_brand: classify_card(&req.card_number),
        masked: mask_card_number(&req.card_number),
        expiration_valid: req
            .expiration
            .as_deref()
            .map(|exp| validate_expiration(exp, today)),
    }))
}

/// POST /api/validate-cpf
pub async fn validate_cpf(body: Bytes) -> Result<Json<ValidateCpfResponse>, AppError> {
    let req: ValidateCpfRequest = parse_json(&body)?;

    let response = match check_cpf(&req.cpf) {
        Ok(()) => ValidateCpfResponse {
            valid: true,
            reason: None,
        },
        Err(e) => ValidateCpfResponse {
            valid: false,
            reason: Some(e.to_string()),
        },
    };

    Ok(Json(response))
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn checkout_method_not_allowed() -> (StatusCode, Json<CheckoutResponse>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(CheckoutResponse::rejected("method not allowed")),
    )
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Invalid JSON body: {}", e);
        AppError::BadRequest("invalid json".to_string())
    })
}
