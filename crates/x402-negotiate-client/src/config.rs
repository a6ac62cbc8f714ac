use std::env;

use url::Url;
use x402::X402Error;
use x402_wallet::WalletConfig;

const DEFAULT_RESOURCE_URL: &str = "http://localhost:4021/article";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Protected resource to negotiate for
    pub resource_url: Url,
    /// Pay without asking (non-interactive runs)
    pub auto_approve: bool,
    pub wallet: WalletConfig,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, X402Error> {
        let resource_url =
            env::var("RESOURCE_URL").unwrap_or_else(|_| DEFAULT_RESOURCE_URL.to_string());
        let resource_url = Url::parse(&resource_url)
            .map_err(|_| X402Error::ConfigError(format!("invalid RESOURCE_URL: {resource_url}")))?;

        let auto_approve = env::var("X402_AUTO_APPROVE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            resource_url,
            auto_approve,
            wallet: WalletConfig::from_env()?,
        })
    }
}
