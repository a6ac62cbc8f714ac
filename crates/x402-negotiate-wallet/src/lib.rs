//! EVM wallet for x402 negotiation.
//!
//! [`EvmWallet`] holds an optional local key. Connecting exposes the key's
//! address; paying sends a native-currency transfer through an alloy provider
//! and waits for the configured number of confirmations.

pub mod config;

use std::sync::Mutex;
use std::time::Duration;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use url::Url;
use x402::{PaymentTerms, WalletSigner, X402Error};

pub use config::{ConfigError, WalletConfig};

pub struct EvmWallet {
    signer: Option<PrivateKeySigner>,
    rpc_url: Url,
    confirmations: u64,
    receipt_timeout: Duration,
    connected: Mutex<Option<Address>>,
}

impl EvmWallet {
    pub fn new(signer: Option<PrivateKeySigner>, rpc_url: Url) -> Self {
        Self {
            signer,
            rpc_url,
            confirmations: 1,
            receipt_timeout: Duration::from_secs(120),
            connected: Mutex::new(None),
        }
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self, ConfigError> {
        let signer = config
            .private_key
            .as_deref()
            .map(parse_private_key)
            .transpose()?;
        Ok(Self::new(signer, config.rpc_url.clone())
            .with_confirmations(config.confirmations)
            .with_receipt_timeout(config.receipt_timeout))
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Address of the configured key, whether or not it has been connected.
    pub fn address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    fn connected(&self) -> Option<Address> {
        *self.connected.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn connect(&self) -> Result<(Address, PrivateKeySigner), X402Error> {
        let signer = self.signer.clone().ok_or_else(|| {
            X402Error::NoWalletAvailable("no signing key configured".to_string())
        })?;
        let address = signer.address();
        *self.connected.lock().unwrap_or_else(|e| e.into_inner()) = Some(address);
        Ok((address, signer))
    }
}

impl WalletSigner for EvmWallet {
    async fn get_current_address(&self) -> Option<String> {
        self.connected().map(|a| a.to_string())
    }

    async fn connect_wallet(&self) -> Result<String, X402Error> {
        let (address, _) = self.connect()?;
        tracing::info!(address = %address, "wallet connected");
        Ok(address.to_string())
    }

    async fn pay_request(&self, terms: &PaymentTerms) -> Result<String, X402Error> {
        let (from, signer) = match self.connect() {
            Ok(connected) => connected,
            Err(e) => {
                tracing::warn!(error = %e, "auto-connect before payment failed");
                return Err(X402Error::NotConnected);
            }
        };

        let to: Address = terms.recipient().parse().map_err(|_| {
            X402Error::MalformedTerms(format!(
                "recipient is not an EVM address: {}",
                terms.recipient()
            ))
        })?;
        let value = terms.amount_base_units()?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.rpc_url.clone());

        match (provider.get_chain_id().await, terms.chain_id_number()) {
            (Ok(actual), Ok(expected)) if actual != expected => {
                tracing::warn!(
                    expected,
                    actual,
                    "wallet is on a different chain than the payment terms"
                );
            }
            (Err(e), _) => {
                tracing::warn!(error = %e, "could not read chain id from RPC");
            }
            _ => {}
        }

        tracing::info!(from = %from, to = %to, value = %value, "sending payment");

        let tx = TransactionRequest::default().with_to(to).with_value(value);
        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| X402Error::TransactionFailed(format!("send failed: {e}")))?;

        let receipt = tokio::time::timeout(
            self.receipt_timeout,
            pending
                .with_required_confirmations(self.confirmations)
                .get_receipt(),
        )
        .await
        .map_err(|_| {
            X402Error::TransactionFailed(format!(
                "no receipt after {}s",
                self.receipt_timeout.as_secs()
            ))
        })?
        .map_err(|e| X402Error::TransactionFailed(format!("receipt failed: {e}")))?;

        if !receipt.status() {
            return Err(X402Error::TransactionFailed("transfer reverted".to_string()));
        }

        let reference = format!("{:#x}", receipt.transaction_hash);
        tracing::info!(tx = %reference, confirmations = self.confirmations, "payment confirmed");
        Ok(reference)
    }
}

/// Parse a hex private key, with or without the `0x` prefix.
pub fn parse_private_key(key: &str) -> Result<PrivateKeySigner, ConfigError> {
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse()
        .map_err(|e| ConfigError::InvalidKey(format!("{e}")))
}
