use std::env;

use x402::paywall::premium_article_resource;
use x402::{
    Paywall, PaymentTerms, DEFAULT_CHAIN_ID, DEFAULT_CURRENCY, DEFAULT_PRICE_WEI, DEFAULT_REASON,
    DEFAULT_RECIPIENT,
};

const DEFAULT_PORT: u16 = 4021;
const DEFAULT_RATE_LIMIT_RPM: u64 = 60;

#[derive(Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,
    /// Payment recipient
    pub pay_to: String,
    /// Price in wei, as a decimal string
    pub price_wei: String,
    /// Chain the payment must be made on (hex or decimal)
    pub chain_id: String,
    pub currency: String,
    pub reason: Option<String>,
    /// CORS allowed origins (empty = localhost only)
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u64,
    /// Bearer token required for /metrics endpoint
    pub metrics_token: Option<String>,
    /// Serve /metrics without a token
    pub public_metrics: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("pay_to", &self.pay_to)
            .field("price_wei", &self.price_wei)
            .field("chain_id", &self.chain_id)
            .field("currency", &self.currency)
            .field("reason", &self.reason)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_metrics", &self.public_metrics)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            pay_to: DEFAULT_RECIPIENT.to_string(),
            price_wei: DEFAULT_PRICE_WEI.to_string(),
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            reason: Some(DEFAULT_REASON.to_string()),
            allowed_origins: Vec::new(),
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            metrics_token: None,
            public_metrics: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match env::var("PORT") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("PORT", v))?,
            Err(_) => defaults.port,
        };

        let pay_to = env::var("PAY_TO").unwrap_or(defaults.pay_to);
        let price_wei = env::var("PRICE_WEI").unwrap_or(defaults.price_wei);
        let chain_id = env::var("CHAIN_ID").unwrap_or(defaults.chain_id);
        let currency = env::var("CURRENCY").unwrap_or(defaults.currency);
        let reason = match env::var("REASON") {
            Ok(r) if r.is_empty() => None,
            Ok(r) => Some(r),
            Err(_) => defaults.reason,
        };

        let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_rpm = match env::var("RATE_LIMIT_RPM") {
            Ok(v) => match v.parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidNumber("RATE_LIMIT_RPM", v)),
            },
            Err(_) => defaults.rate_limit_rpm,
        };

        let metrics_token = env::var("METRICS_TOKEN").ok().filter(|s| !s.is_empty());
        let public_metrics = env::var("X402_PUBLIC_METRICS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let config = Self {
            port,
            pay_to,
            price_wei,
            chain_id,
            currency,
            reason,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
            public_metrics,
        };
        // Fail at startup rather than on the first request.
        config.terms().validate().map_err(|e| ConfigError::InvalidTerms(e.to_string()))?;
        Ok(config)
    }

    pub fn terms(&self) -> PaymentTerms {
        let terms = PaymentTerms::new(
            self.chain_id.as_str(),
            self.pay_to.as_str(),
            self.price_wei.as_str(),
            self.currency.as_str(),
        );
        match &self.reason {
            Some(reason) => terms.with_reason(reason.as_str()),
            None => terms,
        }
    }

    /// The paywall selling the premium article at the configured price.
    pub fn paywall(&self) -> Result<Paywall, ConfigError> {
        Paywall::new(self.terms(), premium_article_resource())
            .map_err(|e| ConfigError::InvalidTerms(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidNumber(&'static str, String),

    #[error("invalid payment terms: {0}")]
    InvalidTerms(String),
}
