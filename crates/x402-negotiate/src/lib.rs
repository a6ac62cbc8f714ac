//! x402 payment negotiation over HTTP 402.
//!
//! A client asks for a protected resource, receives `402 Payment Required`
//! with machine-readable payment terms, pays them on-chain through a wallet,
//! and retries with the transaction hash as proof in the `Authorization`
//! header.
//!
//! # Pieces
//!
//! - [`PaymentTerms`]: what the server demands
//! - [`ProofOfPayment`] and [`proof::encode`]/[`proof::decode`]: the credential
//! - [`WalletSigner`]: connects and pays
//! - [`ResourceServer`]: answers requests with or without a credential
//! - [`NegotiationController`]: the state machine tying them together
//! - [`Paywall`]: an in-process server applying the syntactic credential rule
//!
//! # Quick example
//!
//! ```no_run
//! use x402::{Challenge, NegotiationController, Paywall, WalletSigner};
//!
//! # async fn run(wallet: impl WalletSigner) -> Result<(), x402::X402Error> {
//! let controller = NegotiationController::new(Paywall::premium_article(), wallet);
//!
//! if let Challenge::PaymentRequired(terms) = controller.negotiate_access().await? {
//!     println!("pay {} {}", terms.display_amount()?, terms.currency());
//!     let article = controller.confirm().await?;
//!     println!("{}", article.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod negotiation;
pub mod paywall;
pub mod proof;
pub mod resource;
pub mod terms;
pub mod wallet;

// Re-exports
pub use constants::*;
pub use error::{ErrorKind, X402Error};
pub use negotiation::{Challenge, NegotiationController, NegotiationState};
pub use paywall::Paywall;
pub use proof::ProofOfPayment;
pub use resource::{PaymentRequiredBody, ProtectedResource, ResourceResponse, ResourceServer};
pub use terms::{format_display_amount, parse_base_units, parse_display_amount, PaymentTerms};
pub use wallet::WalletSigner;
