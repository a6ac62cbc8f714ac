//! The payment negotiation state machine.
//!
//! One [`NegotiationController`] drives one negotiation at a time:
//!
//! ```text
//! Idle -> DetectingChallenge -> AwaitingUserApproval -> SubmittingTransaction
//!      -> VerifyingWithServer -> Success
//! ```
//!
//! A payment-required answer to the first request is the expected way terms
//! are discovered, not a failure. Every other failure lands in `Error`, which
//! the caller acknowledges to get back to `Idle`. Nothing is retried.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;

use crate::error::{ErrorKind, X402Error};
use crate::proof::ProofOfPayment;
use crate::resource::{ProtectedResource, ResourceResponse, ResourceServer};
use crate::terms::PaymentTerms;
use crate::wallet::WalletSigner;

/// Externally observable state of a negotiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum NegotiationState {
    #[default]
    Idle,
    DetectingChallenge,
    AwaitingUserApproval,
    SubmittingTransaction,
    VerifyingWithServer,
    Success,
    Error,
}

impl NegotiationState {
    /// A network or wallet call is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::DetectingChallenge | Self::SubmittingTransaction | Self::VerifyingWithServer
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::DetectingChallenge => "detecting_challenge",
            Self::AwaitingUserApproval => "awaiting_user_approval",
            Self::SubmittingTransaction => "submitting_transaction",
            Self::VerifyingWithServer => "verifying_with_server",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Result of the unauthenticated first request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// The server wants payment; confirm or cancel next.
    PaymentRequired(PaymentTerms),
    /// The server released the resource without payment.
    Unlocked(ProtectedResource),
}

#[derive(Debug, Default)]
struct Session {
    state: NegotiationState,
    attempt: u64,
    terms: Option<PaymentTerms>,
    proof: Option<ProofOfPayment>,
    resource: Option<ProtectedResource>,
    last_error: Option<ErrorKind>,
}

/// Drives a single negotiation against a resource server and a wallet.
///
/// Methods take `&self`, so a controller shared behind an `Arc` can be
/// cancelled from another task while a wallet or verification call is
/// outstanding. The abandoned call's eventual response is discarded.
pub struct NegotiationController<R, W> {
    server: R,
    wallet: W,
    session: Mutex<Session>,
    state_tx: watch::Sender<NegotiationState>,
    attempt_tx: watch::Sender<u64>,
}

impl<R: ResourceServer, W: WalletSigner> NegotiationController<R, W> {
    pub fn new(server: R, wallet: W) -> Self {
        Self {
            server,
            wallet,
            session: Mutex::new(Session::default()),
            state_tx: watch::channel(NegotiationState::Idle).0,
            attempt_tx: watch::channel(0).0,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.session().state
    }

    /// Receive every state change. The receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<NegotiationState> {
        self.state_tx.subscribe()
    }

    /// Terms of the negotiation in progress, if any have been received.
    pub fn terms(&self) -> Option<PaymentTerms> {
        self.session().terms.clone()
    }

    pub fn proof(&self) -> Option<ProofOfPayment> {
        self.session().proof.clone()
    }

    /// The resource delivered by the last successful negotiation.
    pub fn resource(&self) -> Option<ProtectedResource> {
        self.session().resource.clone()
    }

    /// Kind of the failure that put the controller into `Error`.
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.session().last_error
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn server(&self) -> &R {
        &self.server
    }

    /// Connect the wallet outside of any negotiation. Failures are returned
    /// as-is and never change the negotiation state.
    pub async fn connect_wallet(&self) -> Result<String, X402Error> {
        match self.wallet.connect_wallet().await {
            Ok(address) => {
                tracing::info!(address = %address, "wallet connected");
                Ok(address)
            }
            Err(e) => {
                tracing::warn!(error = %e, "wallet connection failed");
                Err(e)
            }
        }
    }

    /// Issue the unauthenticated request and interpret the answer.
    ///
    /// Only valid from `Idle`. On [`Challenge::PaymentRequired`] the controller
    /// waits in `AwaitingUserApproval` for [`confirm`](Self::confirm) or
    /// [`cancel`](Self::cancel).
    ///
    /// Dropping the future before the server answers leaves the controller in
    /// `Error` with [`ErrorKind::Cancelled`].
    pub async fn negotiate_access(&self) -> Result<Challenge, X402Error> {
        let attempt = {
            let mut s = self.session();
            if s.state != NegotiationState::Idle {
                return Err(X402Error::InvalidState(format!(
                    "negotiation already in progress ({})",
                    s.state
                )));
            }
            s.terms = None;
            s.proof = None;
            s.resource = None;
            s.last_error = None;
            self.begin_attempt(&mut s);
            self.set_state(&mut s, NegotiationState::DetectingChallenge);
            s.attempt
        };

        let in_flight = InFlight::new(self, attempt, NegotiationState::DetectingChallenge);
        tracing::info!(attempt, "requesting resource without credential");
        let response = self.server.request(None).await;

        let mut s = self.session();
        in_flight.disarm();
        Self::ensure_current(&s, attempt, NegotiationState::DetectingChallenge)?;
        match response {
            ResourceResponse::Delivered(resource) => {
                tracing::info!(attempt, resource = %resource.id, "resource delivered without payment");
                s.resource = Some(resource.clone());
                self.set_state(&mut s, NegotiationState::Success);
                Ok(Challenge::Unlocked(resource))
            }
            ResourceResponse::PaymentRequired(terms) => {
                if let Err(e) = terms.validate() {
                    return Err(self.fail(&mut s, e));
                }
                tracing::info!(
                    attempt,
                    chain_id = %terms.chain_id(),
                    recipient = %terms.recipient(),
                    amount = %terms.amount(),
                    currency = %terms.currency(),
                    "payment required"
                );
                s.terms = Some(terms.clone());
                self.set_state(&mut s, NegotiationState::AwaitingUserApproval);
                Ok(Challenge::PaymentRequired(terms))
            }
            ResourceResponse::Failed(e) => Err(self.fail(&mut s, e)),
        }
    }

    /// Approve the stored terms: pay through the wallet, then resubmit the
    /// request with the resulting credential.
    ///
    /// Dropped mid-call, this ends in `Error` the same way as
    /// [`negotiate_access`](Self::negotiate_access).
    pub async fn confirm(&self) -> Result<ProtectedResource, X402Error> {
        let (attempt, terms) = {
            let mut s = self.session();
            if s.state != NegotiationState::AwaitingUserApproval {
                return Err(X402Error::InvalidState(format!(
                    "nothing to confirm ({})",
                    s.state
                )));
            }
            let Some(terms) = s.terms.clone() else {
                return Err(X402Error::InvalidState(
                    "awaiting approval without payment terms".to_string(),
                ));
            };
            self.set_state(&mut s, NegotiationState::SubmittingTransaction);
            (s.attempt, terms)
        };

        let paying = InFlight::new(self, attempt, NegotiationState::SubmittingTransaction);
        let paid = tokio::select! {
            biased;
            _ = self.abandoned(attempt) => return Err(X402Error::Cancelled),
            result = self.wallet.pay_request(&terms) => result,
        };

        let credential = {
            let mut s = self.session();
            paying.disarm();
            Self::ensure_current(&s, attempt, NegotiationState::SubmittingTransaction)?;
            let proof = match paid.and_then(ProofOfPayment::new) {
                Ok(proof) => proof,
                Err(e) => return Err(self.fail(&mut s, e)),
            };
            tracing::info!(attempt, tx = %proof.reference(), "payment confirmed, verifying with server");
            let credential = proof.credential();
            s.proof = Some(proof);
            self.set_state(&mut s, NegotiationState::VerifyingWithServer);
            credential
        };

        let verifying = InFlight::new(self, attempt, NegotiationState::VerifyingWithServer);
        let response = tokio::select! {
            biased;
            _ = self.abandoned(attempt) => return Err(X402Error::Cancelled),
            response = self.server.request(Some(&credential)) => response,
        };

        let mut s = self.session();
        verifying.disarm();
        Self::ensure_current(&s, attempt, NegotiationState::VerifyingWithServer)?;
        match response {
            ResourceResponse::Delivered(resource) => {
                tracing::info!(attempt, resource = %resource.id, "resource unlocked");
                s.terms = None;
                s.proof = None;
                s.resource = Some(resource.clone());
                self.set_state(&mut s, NegotiationState::Success);
                Ok(resource)
            }
            ResourceResponse::PaymentRequired(_) => {
                let e = X402Error::VerificationFailed(
                    "server still requires payment after proof was submitted".to_string(),
                );
                Err(self.fail(&mut s, e))
            }
            ResourceResponse::Failed(e) => {
                Err(self.fail(&mut s, X402Error::VerificationFailed(e.to_string())))
            }
        }
    }

    /// Abandon the negotiation and return to `Idle`.
    ///
    /// Allowed while awaiting approval and while the wallet or verification
    /// call is outstanding. Rejected everywhere else, including while the
    /// first request is still in flight.
    pub fn cancel(&self) -> Result<(), X402Error> {
        let mut s = self.session();
        let from = s.state;
        match from {
            NegotiationState::AwaitingUserApproval
            | NegotiationState::SubmittingTransaction
            | NegotiationState::VerifyingWithServer => {
                if from == NegotiationState::SubmittingTransaction {
                    tracing::warn!(
                        attempt = s.attempt,
                        "cancelled during wallet submission; the transfer may still settle on-chain"
                    );
                }
                self.begin_attempt(&mut s);
                s.terms = None;
                s.proof = None;
                s.resource = None;
                self.set_state(&mut s, NegotiationState::Idle);
                tracing::info!(from = %from, "negotiation cancelled");
                Ok(())
            }
            other => Err(X402Error::InvalidState(format!("cannot cancel while {other}"))),
        }
    }

    /// Acknowledge a terminal outcome and return to `Idle`.
    pub fn acknowledge(&self) -> Result<(), X402Error> {
        let mut s = self.session();
        if !s.state.is_terminal() {
            return Err(X402Error::InvalidState(format!(
                "nothing to acknowledge ({})",
                s.state
            )));
        }
        s.terms = None;
        s.proof = None;
        s.resource = None;
        self.set_state(&mut s, NegotiationState::Idle);
        Ok(())
    }

    /// Run a whole negotiation, asking `approve` whether to pay the terms.
    ///
    /// A declined approval cancels back to `Idle` and returns
    /// [`X402Error::UserRejected`].
    pub async fn negotiate_with<F>(&self, approve: F) -> Result<ProtectedResource, X402Error>
    where
        F: FnOnce(&PaymentTerms) -> bool,
    {
        match self.negotiate_access().await? {
            Challenge::Unlocked(resource) => Ok(resource),
            Challenge::PaymentRequired(terms) => {
                if approve(&terms) {
                    self.confirm().await
                } else {
                    self.cancel()?;
                    Err(X402Error::UserRejected("payment declined".to_string()))
                }
            }
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_attempt(&self, s: &mut Session) {
        s.attempt += 1;
        self.attempt_tx.send_replace(s.attempt);
    }

    fn set_state(&self, s: &mut Session, next: NegotiationState) {
        let prev = s.state;
        s.state = next;
        self.state_tx.send_replace(next);
        tracing::debug!(attempt = s.attempt, from = %prev, to = %next, "negotiation state changed");
    }

    fn fail(&self, s: &mut Session, error: X402Error) -> X402Error {
        tracing::warn!(attempt = s.attempt, kind = ?error.kind(), error = %error, "negotiation failed");
        s.last_error = Some(error.kind());
        self.set_state(s, NegotiationState::Error);
        error
    }

    fn ensure_current(
        s: &Session,
        attempt: u64,
        expected: NegotiationState,
    ) -> Result<(), X402Error> {
        if s.attempt != attempt || s.state != expected {
            tracing::debug!(attempt, "discarding response for abandoned negotiation");
            return Err(X402Error::Cancelled);
        }
        Ok(())
    }

    /// Resolves once `attempt` is no longer the live attempt.
    async fn abandoned(&self, attempt: u64) {
        let mut rx = self.attempt_tx.subscribe();
        // The sender lives as long as `self`, so this only returns on change.
        let _ = rx.wait_for(|current| *current != attempt).await;
    }
}

/// Held across each outstanding call. If the caller drops the negotiation
/// future before the call returns, the drop moves the controller to `Error`
/// so it can be acknowledged instead of sitting in an in-flight state.
struct InFlight<'a, R: ResourceServer, W: WalletSigner> {
    controller: &'a NegotiationController<R, W>,
    attempt: u64,
    during: NegotiationState,
    armed: bool,
}

impl<'a, R: ResourceServer, W: WalletSigner> InFlight<'a, R, W> {
    fn new(
        controller: &'a NegotiationController<R, W>,
        attempt: u64,
        during: NegotiationState,
    ) -> Self {
        Self {
            controller,
            attempt,
            during,
            armed: true,
        }
    }

    /// The call returned; the caller handles the outcome from here.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<R: ResourceServer, W: WalletSigner> Drop for InFlight<'_, R, W> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let c = self.controller;
        let mut s = c.session();
        // Already cancelled or superseded.
        if s.attempt != self.attempt || s.state != self.during {
            return;
        }
        if self.during == NegotiationState::SubmittingTransaction {
            tracing::warn!(
                attempt = s.attempt,
                "negotiation dropped during wallet submission; the transfer may still settle on-chain"
            );
        }
        c.begin_attempt(&mut s);
        c.fail(&mut s, X402Error::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paywall::Paywall;

    struct NoWallet;

    impl WalletSigner for NoWallet {
        async fn get_current_address(&self) -> Option<String> {
            None
        }

        async fn connect_wallet(&self) -> Result<String, X402Error> {
            Err(X402Error::NoWalletAvailable("none configured".to_string()))
        }

        async fn pay_request(&self, _terms: &PaymentTerms) -> Result<String, X402Error> {
            Err(X402Error::NotConnected)
        }
    }

    fn controller() -> NegotiationController<Paywall, NoWallet> {
        NegotiationController::new(Paywall::premium_article(), NoWallet)
    }

    #[test]
    fn test_starts_idle() {
        let c = controller();
        assert_eq!(c.state(), NegotiationState::Idle);
        assert!(c.terms().is_none());
        assert!(c.last_error().is_none());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(NegotiationState::AwaitingUserApproval.to_string(), "awaiting_user_approval");
        assert!(NegotiationState::VerifyingWithServer.is_in_flight());
        assert!(!NegotiationState::AwaitingUserApproval.is_in_flight());
        assert!(NegotiationState::Error.is_terminal());
    }

    #[test]
    fn test_confirm_cancel_acknowledge_rejected_from_idle() {
        let c = controller();
        assert!(matches!(c.cancel(), Err(X402Error::InvalidState(_))));
        assert!(matches!(c.acknowledge(), Err(X402Error::InvalidState(_))));
        assert_eq!(c.state(), NegotiationState::Idle);
    }

    #[tokio::test]
    async fn test_confirm_requires_awaiting_approval() {
        let c = controller();
        assert!(matches!(c.confirm().await, Err(X402Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_second_negotiation_rejected_while_busy() {
        let c = controller();
        c.negotiate_access().await.unwrap();
        assert_eq!(c.state(), NegotiationState::AwaitingUserApproval);
        assert!(matches!(
            c.negotiate_access().await,
            Err(X402Error::InvalidState(_))
        ));
        assert_eq!(c.state(), NegotiationState::AwaitingUserApproval);
    }

    #[tokio::test]
    async fn test_wallet_connect_failure_leaves_state_alone() {
        let c = controller();
        c.negotiate_access().await.unwrap();
        let err = c.connect_wallet().await.unwrap_err();
        assert!(matches!(err, X402Error::NoWalletAvailable(_)));
        assert_eq!(c.state(), NegotiationState::AwaitingUserApproval);
        assert!(c.terms().is_some());
    }

    #[tokio::test]
    async fn test_not_connected_wallet_ends_in_error() {
        let c = controller();
        c.negotiate_access().await.unwrap();
        assert!(matches!(c.confirm().await, Err(X402Error::NotConnected)));
        assert_eq!(c.state(), NegotiationState::Error);
        assert_eq!(c.last_error(), Some(ErrorKind::NotConnected));

        c.acknowledge().unwrap();
        assert_eq!(c.state(), NegotiationState::Idle);
        assert!(c.terms().is_none());
    }
}
