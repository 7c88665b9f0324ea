//! Error taxonomy shared across the fragpay SDK.

use core::fmt;

use alloy_primitives::Address;
use fragment_core::TokenAmount;
use sponsor_rpc::RpcError;
use thiserror::Error;

/// Result type alias that carries [`Error`] failures.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable numeric codes, one per [`Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    /// Selection did not reach the payment target.
    InsufficientFunds = 1001,
    /// Batch construction aborted for one fragment.
    BuildFailure = 2001,
    /// Sponsor unreachable, returned non-2xx or reported failure.
    SponsorshipFailed = 3001,
    /// Batch failed structural validation before submission.
    ValidationFailed = 3101,
    /// Chain read outside of a build.
    Transport = 4001,
    /// Malformed caller input.
    InvalidInput = 4101,
}

impl ErrorCode {
    /// Numeric representation associated with the error.
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}

/// Where in the per-fragment pipeline a build aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Preflight,
    DeploymentCall,
    NonceRead,
    KeyDerivation,
    Signing,
    StateTransition,
}

impl BuildStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::DeploymentCall => "deployment_call",
            Self::NonceRead => "nonce_read",
            Self::KeyDerivation => "key_derivation",
            Self::Signing => "signing",
            Self::StateTransition => "state_transition",
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: TokenAmount,
        available: TokenAmount,
    },
    #[error("build failed for wallet {wallet} at {stage}: {reason}")]
    BuildFailure {
        wallet: Address,
        stage: BuildStage,
        reason: String,
    },
    #[error("sponsorship failed: {message}")]
    SponsorshipFailed {
        message: String,
        status: Option<u16>,
        /// The request may not have reached the sponsor.
        network: bool,
    },
    #[error("batch validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },
    #[error("chain transport: {0}")]
    Transport(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            Self::BuildFailure { .. } => ErrorCode::BuildFailure,
            Self::SponsorshipFailed { .. } => ErrorCode::SponsorshipFailed,
            Self::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            Self::Transport(_) => ErrorCode::Transport,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
        }
    }

    /// True for network-class sponsorship failures and chain transport errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SponsorshipFailed { network, .. } => *network,
            Self::Transport(_) => true,
            _ => false,
        }
    }

    pub(crate) fn build(wallet: Address, stage: BuildStage, reason: impl fmt::Display) -> Self {
        Self::BuildFailure {
            wallet,
            stage,
            reason: reason.to_string(),
        }
    }
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        let network = err.is_network();
        let status = err.status();
        let message = match err {
            RpcError::Status { message, .. } => message,
            RpcError::Rejected(message) => message,
            other => other.to_string(),
        };
        Self::SponsorshipFailed {
            message,
            status,
            network,
        }
    }
}
