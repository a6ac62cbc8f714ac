//! Proof-of-payment credentials.
//!
//! A credential is the scheme, one space, and the wallet's transaction
//! reference: `"x402 0x<64 hex chars>"`. Checks here are purely syntactic.
//! Whether the referenced transaction exists, is confirmed, or pays the right
//! recipient is the resource server's business.

use serde::{Deserialize, Serialize};

use crate::constants::{CREDENTIAL_SCHEME, TX_REFERENCE_LEN};
use crate::error::X402Error;

/// A transaction reference asserted by the wallet to identify a confirmed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofOfPayment(String);

impl ProofOfPayment {
    pub fn new(reference: impl Into<String>) -> Result<Self, X402Error> {
        let reference = reference.into();
        if reference.is_empty() {
            return Err(X402Error::TransactionFailed(
                "wallet returned an empty transaction reference".to_string(),
            ));
        }
        Ok(Self(reference))
    }

    pub fn reference(&self) -> &str {
        &self.0
    }

    /// The `Authorization` header value for this proof.
    pub fn credential(&self) -> String {
        format!("{CREDENTIAL_SCHEME} {}", self.0)
    }
}

/// Build a credential from a transaction reference.
pub fn encode(reference: &str) -> Result<String, X402Error> {
    ProofOfPayment::new(reference).map(|p| p.credential())
}

/// Extract the transaction reference from a credential.
///
/// Fails when the scheme prefix is missing or the reference is not exactly
/// [`TX_REFERENCE_LEN`] characters long.
pub fn decode(credential: &str) -> Result<&str, X402Error> {
    let reference = credential
        .strip_prefix(CREDENTIAL_SCHEME)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or(X402Error::MissingOrInvalidCredential)?;

    if reference.len() != TX_REFERENCE_LEN {
        return Err(X402Error::MissingOrInvalidCredential);
    }
    Ok(reference)
}
