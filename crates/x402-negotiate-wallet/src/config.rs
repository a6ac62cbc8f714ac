use std::env;
use std::time::Duration;

use url::Url;

const DEFAULT_CONFIRMATIONS: u64 = 1;
const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct WalletConfig {
    /// Hex private key of the paying account (None = no wallet available)
    pub private_key: Option<String>,
    /// JSON-RPC endpoint used to submit and confirm transfers
    pub rpc_url: Url,
    /// Confirmations to wait for before a payment counts as done
    pub confirmations: u64,
    /// Upper bound on waiting for the receipt
    pub receipt_timeout: Duration,
}

impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("rpc_url", &self.rpc_url.as_str())
            .field("confirmations", &self.confirmations)
            .field("receipt_timeout", &self.receipt_timeout)
            .finish()
    }
}

impl WalletConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: signing key
        let private_key = env::var("EVM_PRIVATE_KEY").ok().filter(|s| !s.is_empty());

        // Optional: RPC URL
        let rpc_url = env::var("RPC_URL").unwrap_or_else(|_| x402::RPC_URL.to_string());
        let rpc_url = Url::parse(&rpc_url).map_err(|_| ConfigError::InvalidUrl(rpc_url))?;

        let confirmations = match env::var("CONFIRMATIONS") {
            Ok(v) => positive("CONFIRMATIONS", v)?,
            Err(_) => DEFAULT_CONFIRMATIONS,
        };

        // Zero would time out after the transfer is already broadcast.
        let receipt_timeout_secs = match env::var("RECEIPT_TIMEOUT_SECS") {
            Ok(v) => positive("RECEIPT_TIMEOUT_SECS", v)?,
            Err(_) => DEFAULT_RECEIPT_TIMEOUT_SECS,
        };

        if private_key.is_none() {
            tracing::warn!("EVM_PRIVATE_KEY not set, payments will fail with no wallet available");
        }

        Ok(Self {
            private_key,
            rpc_url,
            confirmations,
            receipt_timeout: Duration::from_secs(receipt_timeout_secs),
        })
    }
}

fn positive(name: &'static str, value: String) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber(name, value)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid value for {0}: {1}")]
    InvalidNumber(&'static str, String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

impl From<ConfigError> for x402::X402Error {
    fn from(e: ConfigError) -> Self {
        x402::X402Error::ConfigError(e.to_string())
    }
}
