//! Core types for wallet commands
//!
//! Response shapes emitted by the CLI and values exchanged with the wallet
//! service. Field names serialize in the node API's PascalCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plain text command result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageOutput {
    pub message: String,
}

impl MessageOutput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for MessageOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Balances in µBTT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BalanceResponse {
    /// Ledger (off-chain) balance
    pub btfs_wallet_balance: u64,
    /// On-chain balance
    pub btt_wallet_balance: u64,
}

/// Raw balances reported by the wallet service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub chain_balance: i64,
    pub ledger_balance: i64,
}

/// Wallet keys, plaintext before a password is set and encrypted after
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Keys {
    pub private_key: String,
    pub mnemonic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransferResult {
    pub result: bool,
    pub message: String,
}

/// What the wallet service returns for a submitted transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub tx_id: String,
    pub result: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscoveryResult {
    pub key: String,
}

/// Wallet transaction history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionRecord {
    pub id: String,
    pub time_create: DateTime<Utc>,
    /// Amount in µBTT
    pub amount: i64,
    pub from: String,
    pub to: String,
    pub status: String,
    #[serde(rename = "Type")]
    pub tx_type: String,
}

/// Facts about the node the command runs against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub peer_id: String,
    /// Whether the node is running as a daemon
    pub is_daemon: bool,
}

/// Funds-moving operations with a minimum amount enforced by the wallet service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

impl OperationKind {
    /// Canonical text shown when the amount is below the minimum
    pub fn minimum_message(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "Please deposit at least 10,000,000µBTT(=10BTT)",
            OperationKind::Withdraw => "Please withdraw at least 1,000,000,000µBTT(=1000BTT)",
        }
    }

    /// Phrase identifying a threshold violation in legacy error text
    pub fn threshold_marker(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "Please deposit at least",
            OperationKind::Withdraw => "Please withdraw at least",
        }
    }

    /// Documented minimum in µBTT
    pub fn minimum(&self) -> i64 {
        match self {
            OperationKind::Deposit => 10_000_000,
            OperationKind::Withdraw => 1_000_000_000,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Deposit => write!(f, "deposit"),
            OperationKind::Withdraw => write!(f, "withdraw"),
        }
    }
}
