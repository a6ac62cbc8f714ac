use serde::{Deserialize, Serialize};

use crate::constants::X402_VERSION;
use crate::error::X402Error;
use crate::terms::PaymentTerms;

/// Payload released once payment has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedResource {
    pub id: String,
    pub title: String,
    pub body: String,
    pub image_url: String,
}

/// Outcome of one request to a resource server.
#[derive(Debug)]
pub enum ResourceResponse {
    /// The resource itself.
    Delivered(ProtectedResource),
    /// No acceptable credential; these terms unlock the resource.
    PaymentRequired(PaymentTerms),
    /// Anything else: transport failure, unexpected status, unusable 402 body.
    Failed(X402Error),
}

/// Wire-format 402 body. `paymentRequest` is optional on the wire so that a
/// 402 without terms can be reported as a protocol violation rather than a
/// parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    pub x402_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_request: Option<PaymentTerms>,
}

impl PaymentRequiredBody {
    pub fn new(terms: PaymentTerms) -> Self {
        Self {
            x402_version: X402_VERSION,
            error: Some("payment_required".to_string()),
            payment_request: Some(terms),
        }
    }

    /// Interpret the body as a [`ResourceResponse`].
    pub fn into_response(self) -> ResourceResponse {
        match self.payment_request {
            Some(terms) => ResourceResponse::PaymentRequired(terms),
            None => ResourceResponse::Failed(X402Error::ProtocolViolation(
                "402 response carried no payment terms".to_string(),
            )),
        }
    }
}

/// Anything that can answer a resource request, with or without a credential.
pub trait ResourceServer: Send + Sync {
    /// Request the resource. `credential` is the full `Authorization` value.
    fn request(
        &self,
        credential: Option<&str>,
    ) -> impl std::future::Future<Output = ResourceResponse> + Send;
}

impl<T: ResourceServer> ResourceServer for std::sync::Arc<T> {
    fn request(
        &self,
        credential: Option<&str>,
    ) -> impl std::future::Future<Output = ResourceResponse> + Send {
        (**self).request(credential)
    }
}
