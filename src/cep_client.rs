use crate::errors::LookupError;
use crate::models::Address;
use crate::validators::digits_only;
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Address lookup by postal code (CEP).
#[async_trait]
pub trait PostalLookup: Send + Sync {
    /// Resolves a postal code to an address. Implementations normalize the
    /// input with [`normalize_cep`] before any network call.
    async fn lookup(&self, cep: &str) -> Result<Address, LookupError>;
}

/// Strips formatting and checks for exactly 8 digits.
pub fn normalize_cep(raw: &str) -> Result<String, LookupError> {
    let cep = digits_only(raw);
    if cep.len() != 8 {
        return Err(LookupError::InvalidFormat);
    }
    Ok(cep)
}

/// Client for the ViaCEP service (`{base}/{cep}/json/`).
#[derive(Clone)]
pub struct ViaCepClient {
    client: Client,
    base_url: String,
}

impl ViaCepClient {
    /// Creates a new `ViaCepClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service base URL, e.g. `https://viacep.com.br/ws`.
    /// * `timeout` - Upper bound for a single lookup request.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PostalLookup for ViaCepClient {
    async fn lookup(&self, cep: &str) -> Result<Address, LookupError> {
        let cep = normalize_cep(cep)?;
        let url = format!("{}/{}/json/", self.base_url, cep);

        tracing::info!("Looking up CEP {}", cep);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("CEP lookup request failed for {}: {}", cep, e);
            LookupError::ServiceUnavailable
        })?;

        if !response.status().is_success() {
            tracing::warn!("CEP lookup for {} returned status {}", cep, response.status());
            return Err(LookupError::ServiceUnavailable);
        }

        let address: Address = response.json().await.map_err(|e| {
            tracing::warn!("Failed to decode CEP lookup response for {}: {}", cep, e);
            LookupError::InvalidResponse
        })?;

        if address.not_found {
            tracing::info!("CEP {} not found", cep);
            return Err(LookupError::NotFound);
        }

        Ok(address.normalized())
    }
}

/// Caches successful lookups of an inner [`PostalLookup`], keyed by the
/// normalized postal code. Failures are never cached.
pub struct CachedPostalLookup {
    inner: Arc<dyn PostalLookup>,
    cache: Cache<String, Address>,
}

impl CachedPostalLookup {
    pub fn new(inner: Arc<dyn PostalLookup>, ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();
        Self { inner, cache }
    }
}

#[async_trait]
impl PostalLookup for CachedPostalLookup {
    async fn lookup(&self, cep: &str) -> Result<Address, LookupError> {
        let key = normalize_cep(cep)?;

        if let Some(address) = self.cache.get(&key).await {
            tracing::debug!("CEP cache hit: {}", key);
            return Ok(address);
        }

        let address = self.inner.lookup(&key).await?;
        self.cache.insert(key, address.clone()).await;
        Ok(address)
    }
}
