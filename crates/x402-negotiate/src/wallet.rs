use crate::constants::NATIVE_DECIMALS;
use crate::error::X402Error;
use crate::terms::{format_display_amount, PaymentTerms};

/// A wallet able to pay a set of [`PaymentTerms`] on-chain.
///
/// Implementations are long-lived handles passed into the
/// [`NegotiationController`](crate::NegotiationController); the controller
/// never reaches for a process-wide wallet.
pub trait WalletSigner: Send + Sync {
    /// Best-effort check for an already authorized account. Never prompts.
    fn get_current_address(&self) -> impl std::future::Future<Output = Option<String>> + Send;

    /// Request account access.
    ///
    /// Fails with [`X402Error::NoWalletAvailable`] when no wallet is configured
    /// and [`X402Error::UserRejected`] when access is declined.
    fn connect_wallet(&self) -> impl std::future::Future<Output = Result<String, X402Error>> + Send;

    /// Transfer `terms.amount` to `terms.recipient`, wait for one confirmation
    /// and return the transaction reference.
    fn pay_request(
        &self,
        terms: &PaymentTerms,
    ) -> impl std::future::Future<Output = Result<String, X402Error>> + Send;

    /// Render a base-unit amount in whole native units.
    fn format_eth(&self, amount: &str) -> Result<String, X402Error> {
        format_display_amount(amount, NATIVE_DECIMALS)
    }
}

impl<T: WalletSigner> WalletSigner for std::sync::Arc<T> {
    fn get_current_address(&self) -> impl std::future::Future<Output = Option<String>> + Send {
        (**self).get_current_address()
    }

    fn connect_wallet(&self) -> impl std::future::Future<Output = Result<String, X402Error>> + Send {
        (**self).connect_wallet()
    }

    fn pay_request(
        &self,
        terms: &PaymentTerms,
    ) -> impl std::future::Future<Output = Result<String, X402Error>> + Send {
        (**self).pay_request(terms)
    }

    fn format_eth(&self, amount: &str) -> Result<String, X402Error> {
        (**self).format_eth(amount)
    }
}
