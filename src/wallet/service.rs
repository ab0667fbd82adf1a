//! Wallet service boundary
//!
//! Ledger and chain work happens behind [`WalletService`]. The command layer
//! treats every call as opaque apart from one structured failure,
//! [`ServiceError::BelowMinimum`], which it turns into canonical user text.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Error;

use super::types::{Balances, NodeInfo, OperationKind, TransactionRecord, TransferReceipt};

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Failure reported by the wallet service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Amount below the service's minimum for this operation
    #[error("{kind} amount below the minimum of {minimum}µBTT")]
    BelowMinimum { kind: OperationKind, minimum: i64 },

    /// Transport failure; the request may not have reached the service
    #[error("{0}")]
    Unavailable(String),

    /// Any other refusal, text passed through as-is
    #[error("{0}")]
    Rejected(String),
}

impl ServiceError {
    /// Build an error from free-form service text
    ///
    /// Text carrying a threshold phrase ("Please deposit at least", ...) is
    /// recognised as `BelowMinimum` so older nodes that only report strings
    /// still get the canonical message.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        for kind in [OperationKind::Deposit, OperationKind::Withdraw] {
            if message.contains(kind.threshold_marker()) {
                return ServiceError::BelowMinimum {
                    kind,
                    minimum: kind.minimum(),
                };
            }
        }
        ServiceError::Rejected(message)
    }

    /// Map onto the command error for `kind`
    ///
    /// Threshold violations become the canonical text for the operation that
    /// was attempted; everything else passes through unmodified.
    pub fn into_command_error(self, kind: OperationKind) -> Error {
        match self {
            ServiceError::BelowMinimum { .. } => {
                Error::ThresholdViolation(kind.minimum_message().to_string())
            }
            ServiceError::Rejected(msg) if msg.contains(kind.threshold_marker()) => {
                Error::ThresholdViolation(kind.minimum_message().to_string())
            }
            other => other.into(),
        }
    }

    /// Map onto a command error with the service text left as-is
    ///
    /// For operations without a canonical threshold message, such as
    /// transfer.
    pub fn into_passthrough_error(self) -> Error {
        match self {
            ServiceError::BelowMinimum { .. } => Error::Service(self.to_string()),
            other => other.into(),
        }
    }
}

impl From<ServiceError> for Error {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::BelowMinimum { kind, .. } => {
                Error::ThresholdViolation(kind.minimum_message().to_string())
            }
            ServiceError::Unavailable(msg) => Error::ServiceUnavailable(msg),
            ServiceError::Rejected(msg) => Error::Service(msg),
        }
    }
}

/// Ledger / chain operations of the node wallet
#[async_trait]
pub trait WalletService: Send + Sync {
    /// Identity of the node and whether it runs as a daemon
    async fn node_info(&self) -> ServiceResult<NodeInfo>;

    /// Create the wallet for this node
    async fn init(&self) -> ServiceResult<()>;

    /// Move `amount` µBTT from chain to ledger
    ///
    /// With `async_submit` the service returns once the transaction is
    /// submitted instead of waiting for confirmation. The node checks
    /// `password` again on its side.
    async fn deposit(&self, amount: i64, async_submit: bool, password: &str) -> ServiceResult<()>;

    /// Move `amount` µBTT from ledger to chain
    async fn withdraw(&self, amount: i64, password: &str) -> ServiceResult<()>;

    async fn balance(&self) -> ServiceResult<Balances>;

    /// Send `amount` µBTT on chain to `to`
    async fn transfer(&self, to: &str, amount: i64, password: &str)
        -> ServiceResult<TransferReceipt>;

    async fn transactions(&self, peer_id: &str) -> ServiceResult<Vec<TransactionRecord>>;

    /// Replace the node keys; either argument may be empty
    async fn import_keys(&self, private_key: &str, mnemonic: &str) -> ServiceResult<()>;

    /// Fetch a speed-wallet discovery key
    async fn discovery_key(&self) -> ServiceResult<String>;
}
