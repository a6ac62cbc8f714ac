//! In-process resource server that gates one resource behind a fixed demand.
//!
//! Applies only the syntactic credential rule: a well-formed `x402 <tx>`
//! header unlocks the resource, anything else yields the payment terms.
//! On-chain lookup of the referenced transaction is not performed.

use crate::constants::{
    DEFAULT_CHAIN_ID, DEFAULT_CURRENCY, DEFAULT_PRICE_WEI, DEFAULT_REASON, DEFAULT_RECIPIENT,
};
use crate::error::X402Error;
use crate::negotiation::Challenge;
use crate::proof;
use crate::resource::{ProtectedResource, ResourceResponse, ResourceServer};
use crate::terms::PaymentTerms;

#[derive(Debug, Clone)]
pub struct Paywall {
    terms: PaymentTerms,
    resource: ProtectedResource,
}

impl Paywall {
    /// Gate `resource` behind `terms`. The terms are validated once, here.
    pub fn new(terms: PaymentTerms, resource: ProtectedResource) -> Result<Self, X402Error> {
        terms.validate()?;
        Ok(Self { terms, resource })
    }

    /// The premium article priced at 0.000001 ETH on Sepolia.
    pub fn premium_article() -> Self {
        Self {
            terms: default_terms(),
            resource: premium_article_resource(),
        }
    }

    pub fn terms(&self) -> &PaymentTerms {
        &self.terms
    }

    /// Answer a request carrying an optional `Authorization` value.
    ///
    /// Either unlocks the resource or restates the terms; this cannot fail.
    pub fn respond(&self, credential: Option<&str>) -> Challenge {
        match credential.map(proof::decode) {
            Some(Ok(tx)) => {
                tracing::info!(tx = %tx, resource = %self.resource.id, "payment proof accepted");
                Challenge::Unlocked(self.resource.clone())
            }
            Some(Err(_)) => {
                tracing::debug!("credential present but malformed, issuing challenge");
                Challenge::PaymentRequired(self.terms.clone())
            }
            None => Challenge::PaymentRequired(self.terms.clone()),
        }
    }
}

impl ResourceServer for Paywall {
    async fn request(&self, credential: Option<&str>) -> ResourceResponse {
        match self.respond(credential) {
            Challenge::Unlocked(resource) => ResourceResponse::Delivered(resource),
            Challenge::PaymentRequired(terms) => ResourceResponse::PaymentRequired(terms),
        }
    }
}

pub fn default_terms() -> PaymentTerms {
    PaymentTerms::new(
        DEFAULT_CHAIN_ID,
        DEFAULT_RECIPIENT,
        DEFAULT_PRICE_WEI,
        DEFAULT_CURRENCY,
    )
    .with_reason(DEFAULT_REASON)
}

/// The article sold by [`Paywall::premium_article`].
pub fn premium_article_resource() -> ProtectedResource {
    ProtectedResource {
        id: "1".to_string(),
        title: "The Future of Decentralized Payments".to_string(),
        body: "This article was unlocked with an on-chain payment. The server answered the \
               first request with HTTP 402 and its payment terms, the wallet paid, and the \
               transaction hash came back in the Authorization header as proof."
            .to_string(),
        image_url: "https://picsum.photos/800/400".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    #[test]
    fn test_default_terms_are_valid() {
        let paywall = Paywall::premium_article();
        assert!(paywall.terms().validate().is_ok());
        assert_eq!(paywall.terms().amount(), "1000000000000");
        assert_eq!(paywall.terms().currency(), "ETH");
    }

    #[test]
    fn test_challenge_is_idempotent() {
        let paywall = Paywall::premium_article();
        let first = match paywall.respond(None) {
            Challenge::PaymentRequired(t) => t,
            other => panic!("expected challenge, got {other:?}"),
        };
        for _ in 0..5 {
            match paywall.respond(None) {
                Challenge::PaymentRequired(t) => assert_eq!(t, first),
                other => panic!("expected challenge, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_short_reference_is_challenged() {
        let paywall = Paywall::premium_article();
        assert!(matches!(
            paywall.respond(Some("x402 0xabc")),
            Challenge::PaymentRequired(_)
        ));
    }

    #[test]
    fn test_valid_credential_delivers() {
        let paywall = Paywall::premium_article();
        let credential = format!("x402 {TX}");
        match paywall.respond(Some(&credential)) {
            Challenge::Unlocked(r) => assert_eq!(r.id, "1"),
            other => panic!("expected resource, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resource_server_maps_outcomes() {
        let paywall = Paywall::premium_article();
        assert!(matches!(
            paywall.request(None).await,
            ResourceResponse::PaymentRequired(_)
        ));
        let credential = format!("x402 {TX}");
        assert!(matches!(
            paywall.request(Some(&credential)).await,
            ResourceResponse::Delivered(_)
        ));
    }

    #[test]
    fn test_new_rejects_malformed_terms() {
        let terms = PaymentTerms::new("0x1", "", "1", "ETH");
        assert!(Paywall::new(terms, premium_article_resource()).is_err());
    }
}
