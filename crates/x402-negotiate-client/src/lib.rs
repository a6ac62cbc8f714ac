//! HTTP side of x402 negotiation.
//!
//! [`HttpResourceServer`] implements [`x402::ResourceServer`] over reqwest so a
//! [`x402::NegotiationController`] can negotiate with a remote paywall.
//!
//! # Quick Example
//!
//! ```no_run
//! use x402::{NegotiationController, WalletSigner};
//! use x402_client::HttpResourceServer;
//!
//! # async fn run(wallet: impl WalletSigner) -> Result<(), x402::X402Error> {
//! let url = "http://localhost:4021/article".parse().unwrap();
//! let server = HttpResourceServer::new(url)?;
//! let controller = NegotiationController::new(server, wallet);
//!
//! let article = controller.negotiate_with(|_terms| true).await?;
//! println!("{}", article.title);
//! # Ok(())
//! # }
//! ```

pub mod config;

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use url::Url;
use x402::{PaymentRequiredBody, ProtectedResource, ResourceResponse, ResourceServer, X402Error};

pub use config::ClientConfig;

/// A remote resource behind an x402 paywall.
pub struct HttpResourceServer {
    http: reqwest::Client,
    url: Url,
}

impl HttpResourceServer {
    pub fn new(url: Url) -> Result<Self, X402Error> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| X402Error::HttpError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, url })
    }

    /// Create a server handle with a custom reqwest::Client.
    pub fn with_http_client(url: Url, http: reqwest::Client) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn fetch(&self, credential: Option<&str>) -> Result<ResourceResponse, X402Error> {
        let mut req = self.http.get(self.url.clone());
        if let Some(credential) = credential {
            req = req.header(AUTHORIZATION, credential);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| X402Error::HttpError(format!("request failed: {e}")))?;
        let status = resp.status();
        tracing::debug!(url = %self.url, status = %status, with_credential = credential.is_some(), "resource response");

        if status == StatusCode::PAYMENT_REQUIRED {
            let body: PaymentRequiredBody = resp.json().await.map_err(|e| {
                X402Error::ProtocolViolation(format!("failed to parse 402 body: {e}"))
            })?;
            return Ok(body.into_response());
        }

        if status.is_success() {
            let resource: ProtectedResource = resp.json().await.map_err(|e| {
                X402Error::ProtocolViolation(format!("failed to parse resource body: {e}"))
            })?;
            return Ok(ResourceResponse::Delivered(resource));
        }

        Err(X402Error::HttpError(format!("unexpected status {status}")))
    }
}

impl ResourceServer for HttpResourceServer {
    async fn request(&self, credential: Option<&str>) -> ResourceResponse {
        match self.fetch(credential).await {
            Ok(response) => response,
            Err(e) => ResourceResponse::Failed(e),
        }
    }
}
