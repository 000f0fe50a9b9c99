use {
    crate::adapters::{asaas, cardwallet},
    std::{env, str::FromStr, time::Duration},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process configuration, read once at startup from the environment
/// (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub asaas_api_key: Option<String>,
    pub asaas_base_url: String,
    pub cardwallet_access_token: Option<String>,
    pub cardwallet_base_url: String,
    pub cardwallet_notification_url: Option<String>,
    pub mock_gateway_enabled: bool,
    pub http_timeout: Duration,
    pub webhook_token: Option<String>,
    /// Answer 404 for webhooks about unknown payments so the provider redelivers.
    pub webhook_retry_unknown_payment: bool,
    pub sweeper_interval: Duration,
    pub sweeper_stale_after: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            asaas_api_key: optional("ASAAS_API_KEY"),
            asaas_base_url: optional("ASAAS_BASE_URL")
                .unwrap_or_else(|| asaas::DEFAULT_BASE_URL.to_string()),
            cardwallet_access_token: optional("CARDWALLET_ACCESS_TOKEN"),
            cardwallet_base_url: optional("CARDWALLET_BASE_URL")
                .unwrap_or_else(|| cardwallet::DEFAULT_BASE_URL.to_string()),
            cardwallet_notification_url: optional("CARDWALLET_NOTIFICATION_URL"),
            mock_gateway_enabled: parsed("MOCK_GATEWAY_ENABLED", false)?,
            http_timeout: Duration::from_secs(parsed("PAYMENT_HTTP_TIMEOUT_SECS", 30)?),
            webhook_token: optional("WEBHOOK_TOKEN"),
            webhook_retry_unknown_payment: parsed("WEBHOOK_RETRY_UNKNOWN_PAYMENT", false)?,
            sweeper_interval: Duration::from_secs(parsed("SWEEPER_INTERVAL_SECS", 60)?),
            sweeper_stale_after: Duration::from_secs(parsed("SWEEPER_STALE_AFTER_SECS", 600)?),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// Unset and blank are the same thing.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
