use crate::card::{bin_prefix, CardBrand};
use crate::errors::BinLookupError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Issuer information for the leading digits of a card number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BinInfo {
    /// Card network, e.g. `visa`, `mastercard`, `amex`.
    #[serde(default)]
    pub scheme: Option<String>,
    /// Card type (`debit` / `credit`).
    #[serde(default, rename = "type")]
    pub card_type: Option<String>,
    /// Product brand as named by the issuer.
    #[serde(default)]
    pub brand: Option<String>,
}

impl BinInfo {
    pub fn card_brand(&self) -> CardBrand {
        self.scheme
            .as_deref()
            .map(CardBrand::from_scheme)
            .unwrap_or(CardBrand::Unknown)
    }
}

/// Remote BIN (Bank Identification Number) lookup.
#[async_trait]
pub trait BinLookup: Send + Sync {
    async fn lookup(&self, card_number: &str) -> Result<BinInfo, BinLookupError>;
}

/// Client for binlist-compatible services (`{base}/{bin}`).
#[derive(Clone)]
pub struct BinlistClient {
    client: Client,
    base_url: String,
}

impl BinlistClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BinLookup for BinlistClient {
    async fn lookup(&self, card_number: &str) -> Result<BinInfo, BinLookupError> {
        let bin = bin_prefix(card_number).ok_or(BinLookupError::TooShort)?;
        let url = format!("{}/{}", self.base_url, bin);

        // Only the BIN is sent out, never the full number
        tracing::debug!("BIN lookup for {}", bin);

        let response = self
            .client
            .get(&url)
            .header("Accept-Version", "3")
            .send()
            .await
            .map_err(|e| BinLookupError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BinLookupError::Request(format!(
                "status {}",
                response.status()
            )));
        }

        response
            .json::<BinInfo>()
            .await
            .map_err(|e| BinLookupError::InvalidResponse(e.to_string()))
    }
}
