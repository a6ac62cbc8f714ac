use thiserror::Error;

/// Errors returned by x402 negotiation operations.
#[derive(Debug, Error)]
pub enum X402Error {
    #[error("malformed payment terms: {0}")]
    MalformedTerms(String),

    #[error("no wallet available: {0}")]
    NoWalletAvailable(String),

    #[error("wallet not connected")]
    NotConnected,

    #[error("user rejected: {0}")]
    UserRejected(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("missing or invalid credential")]
    MissingOrInvalidCredential,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("negotiation cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("http error: {0}")]
    HttpError(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Discriminant of an [`X402Error`], kept by the controller for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedTerms,
    NoWalletAvailable,
    NotConnected,
    UserRejected,
    TransactionFailed,
    VerificationFailed,
    ProtocolViolation,
    MissingOrInvalidCredential,
    InvalidState,
    Cancelled,
    Config,
    Transport,
    Serialization,
}

impl X402Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            X402Error::MalformedTerms(_) => ErrorKind::MalformedTerms,
            X402Error::NoWalletAvailable(_) => ErrorKind::NoWalletAvailable,
            X402Error::NotConnected => ErrorKind::NotConnected,
            X402Error::UserRejected(_) => ErrorKind::UserRejected,
            X402Error::TransactionFailed(_) => ErrorKind::TransactionFailed,
            X402Error::VerificationFailed(_) => ErrorKind::VerificationFailed,
            X402Error::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            X402Error::MissingOrInvalidCredential => ErrorKind::MissingOrInvalidCredential,
            X402Error::InvalidState(_) => ErrorKind::InvalidState,
            X402Error::Cancelled => ErrorKind::Cancelled,
            X402Error::ConfigError(_) => ErrorKind::Config,
            X402Error::HttpError(_) => ErrorKind::Transport,
            X402Error::SerdeError(_) => ErrorKind::Serialization,
        }
    }
}
