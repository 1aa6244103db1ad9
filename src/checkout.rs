//! Checkout validation pipeline
//!
//! Stages run strictly in order and the first failure is terminal:
//! 1. Decode the request body
//! 2. Required field presence
//! 3. Address verification via postal lookup
//! 4. Card brand classification (optionally via BIN lookup)
//! 5. Simulated payment sanity check
//! 6. Order persistence
//!
//! An order is written only after stages 1-5 succeed, and at most once per
//! request.

use crate::bin_client::BinLookup;
use crate::card::{classify_card, mask_card_number, CardBrand};
use crate::cep_client::PostalLookup;
use crate::errors::{CheckoutError, StoreError};
use crate::models::{Address, CheckoutRequest, CheckoutResponse, NewOrder, ORDER_STATUS_APPROVED};
use crate::order_store::OrderStore;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Which optional stages are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutOptions {
    /// Reject requests without a street number.
    pub require_number: bool,
    /// Record approved orders through the order store.
    pub enable_persistence: bool,
    /// Ask the BIN lookup service before falling back to local classification.
    pub enable_bin_lookup: bool,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            require_number: true,
            enable_persistence: true,
            enable_bin_lookup: false,
        }
    }
}

/// Successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutApproval {
    /// Store-generated id; `None` when persistence is disabled.
    pub order_id: Option<i64>,
    pub card_brand: CardBrand,
    pub address: Address,
}

impl From<CheckoutApproval> for CheckoutResponse {
    fn from(approval: CheckoutApproval) -> Self {
        let message = match approval.order_id {
            Some(id) => format!("Checkout approved! Order ID: {}", id),
            None => "Checkout approved!".to_string(),
        };

        CheckoutResponse {
            success: true,
            message,
            card_brand: Some(approval.card_brand),
            address_info: Some(approval.address),
            order_id: approval.order_id,
        }
    }
}

pub struct CheckoutPipeline {
    postal: Arc<dyn PostalLookup>,
    orders: Option<Arc<dyn OrderStore>>,
    bin_lookup: Option<Arc<dyn BinLookup>>,
    options: CheckoutOptions,
}

impl CheckoutPipeline {
    pub fn new(postal: Arc<dyn PostalLookup>, options: CheckoutOptions) -> Self {
        Self {
            postal,
            orders: None,
            bin_lookup: None,
            options,
        }
    }

    pub fn with_order_store(mut self, orders: Arc<dyn OrderStore>) -> Self {
        self.orders = Some(orders);
        self
    }

    pub fn with_bin_lookup(mut self, bin_lookup: Arc<dyn BinLookup>) -> Self {
        self.bin_lookup = Some(bin_lookup);
        self
    }

    /// Runs the full pipeline over a raw request body.
    pub async fn process(&self, body: &[u8]) -> Result<CheckoutApproval, CheckoutError> {
        let span = tracing::info_span!("checkout", request_id = %Uuid::new_v4());

        async move {
            let request = decode_request(body)?;
            tracing::info!(
                "Checkout started for card {} / CEP {}",
                mask_card_number(&request.card_number),
                request.cep
            );

            match self.run(&request).await {
                Ok(approval) => {
                    tracing::info!(
                        "Checkout approved: brand={}, order_id={:?}",
                        approval.card_brand,
                        approval.order_id
                    );
                    Ok(approval)
                }
                Err(e) => {
                    if e.payment_approved() {
                        tracing::error!("Checkout approved but order not recorded: {}", e);
                    } else {
                        tracing::warn!("Checkout rejected: {}", e);
                    }
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Runs stages 2 through 6 over an already decoded request.
    pub async fn run(&self, request: &CheckoutRequest) -> Result<CheckoutApproval, CheckoutError> {
        check_required_fields(request, &self.options)?;

        let address = self
            .postal
            .lookup(&request.cep)
            .await
            .map_err(CheckoutError::Address)?;

        let card_brand = self.classify(&request.card_number).await;
        if !card_brand.is_known() {
            return Err(CheckoutError::CardBrandUnknown);
        }

        check_payment_fields(request)?;

        let order_id = if self.options.enable_persistence {
            Some(self.persist(request, card_brand, &address).await?)
        } else {
            None
        };

        Ok(CheckoutApproval {
            order_id,
            card_brand,
            address,
        })
    }

    /// BIN lookup wins when it reports a known scheme; any failure falls
    /// back to the local prefix rules.
    async fn classify(&self, card_number: &str) -> CardBrand {
        if self.options.enable_bin_lookup {
            if let Some(ref bin_lookup) = self.bin_lookup {
                match bin_lookup.lookup(card_number).await {
                    Ok(info) if info.card_brand().is_known() => return info.card_brand(),
                    Ok(info) => {
                        tracing::debug!("BIN lookup returned unrecognized scheme: {:?}", info.scheme)
                    }
                    Err(e) => tracing::warn!("BIN lookup failed, using local rules: {}", e),
                }
            }
        }

        classify_card(card_number)
    }

    async fn persist(
        &self,
        request: &CheckoutRequest,
        card_brand: CardBrand,
        address: &Address,
    ) -> Result<i64, CheckoutError> {
        let orders = self.orders.as_ref().ok_or_else(|| {
            StoreError::Unavailable("no order store configured".to_string())
        })?;

        let order = NewOrder {
            card_holder: request.card_holder.trim().to_string(),
            card_brand,
            address_line: address.address_line(&request.number),
            status: ORDER_STATUS_APPROVED.to_string(),
        };

        let stored = orders.insert_order(&order).await?;
        Ok(stored.id)
    }
}

/// Stage 1: decode the JSON body into a typed request.
pub fn decode_request(body: &[u8]) -> Result<CheckoutRequest, CheckoutError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Invalid checkout payload: {}", e);
        CheckoutError::MalformedInput
    })
}

/// Stage 2: configured-required fields must be present.
pub fn check_required_fields(
    request: &CheckoutRequest,
    options: &CheckoutOptions,
) -> Result<(), CheckoutError> {
    if options.require_number && request.number.is_empty() {
        return Err(CheckoutError::MissingField("number"));
    }
    Ok(())
}

/// Stage 5: simulated payment gate, not a real authorization.
pub fn check_payment_fields(request: &CheckoutRequest) -> Result<(), CheckoutError> {
    if request.cvv.chars().count() < 3 || request.expiration.chars().count() < 5 {
        return Err(CheckoutError::PaymentFieldsInvalid);
    }
    Ok(())
}
