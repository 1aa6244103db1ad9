use crate::checkout::CheckoutOptions;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL. `None` runs without an order store.
    pub database_url: Option<String>,
    pub port: u16,
    pub cep_base_url: String,
    /// Zero disables the postal lookup cache.
    pub cep_cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
    pub static_dir: String,
    pub require_number: bool,
    pub enable_persistence: bool,
    pub enable_bin_lookup: bool,
    pub bin_lookup_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the process environment
    /// in production).
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            database_url: present("DB_URL")
                .or_else(|| present("DATABASE_URL"))
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            port: present("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            cep_base_url: http_url(
                "CEP_BASE_URL",
                present("CEP_BASE_URL")
                    .unwrap_or_else(|| "https://viacep.com.br/ws".to_string()),
            )?,
            cep_cache_ttl_secs: number("CEP_CACHE_TTL_SECS", present("CEP_CACHE_TTL_SECS"), 0)?,
            http_timeout_secs: number("HTTP_TIMEOUT_SECS", present("HTTP_TIMEOUT_SECS"), 10)?,
            static_dir: present("STATIC_DIR").unwrap_or_else(|| "./static".to_string()),
            require_number: flag(
                "CHECKOUT_REQUIRE_NUMBER",
                present("CHECKOUT_REQUIRE_NUMBER"),
                true,
            )?,
            enable_persistence: flag(
                "CHECKOUT_ENABLE_PERSISTENCE",
                present("CHECKOUT_ENABLE_PERSISTENCE"),
                true,
            )?,
            enable_bin_lookup: flag(
                "CHECKOUT_ENABLE_BIN_LOOKUP",
                present("CHECKOUT_ENABLE_BIN_LOOKUP"),
                false,
            )?,
            bin_lookup_url: http_url(
                "BIN_LOOKUP_URL",
                present("BIN_LOOKUP_URL")
                    .unwrap_or_else(|| "https://lookup.binlist.net".to_string()),
            )?,
        };

        // Log successful configuration load (without sensitive values)
        match config.database_url {
            Some(ref url) => tracing::debug!(
                "Database URL: {}...",
                url.chars().take(20).collect::<String>()
            ),
            None => tracing::warn!("No DATABASE_URL configured; orders will not be recorded"),
        }
        tracing::debug!("CEP Base URL: {}", config.cep_base_url);
        if config.enable_bin_lookup {
            tracing::info!("BIN lookup enabled: {}", config.bin_lookup_url);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn checkout_options(&self) -> CheckoutOptions {
        CheckoutOptions {
            require_number: self.require_number,
            enable_persistence: self.enable_persistence,
            enable_bin_lookup: self.enable_bin_lookup,
        }
    }
}

fn http_url(key: &str, value: String) -> anyhow::Result<String> {
    let parsed = url::Url::parse(&value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", key, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", key);
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn number(key: &str, value: Option<String>, default: u64) -> anyhow::Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer", key)),
        None => Ok(default),
    }
}

fn flag(key: &str, value: Option<String>, default: bool) -> anyhow::Result<bool> {
    let Some(v) = value else {
        return Ok(default);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be a boolean (true/false)", key),
    }
}
