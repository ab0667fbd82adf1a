//! Wallet module
//!
//! Password-gated access to the node wallet:
//! - Credential gate and one-time password setup
//! - AES encryption of the identity secrets
//! - Dispatch of deposit / withdraw / transfer to the wallet service
//!
//! # Architecture
//!
//! ```text
//! ConfigStore ──► credentials (gate) ──► WalletManager ──► WalletService
//!                                                               ↑
//!                                                      HttpWalletService
//! ```

pub mod client;
pub mod credentials;
pub mod crypto;
pub mod manager;
pub mod service;
pub mod types;

pub use client::HttpWalletService;
pub use manager::{parse_amount, WalletManager};
pub use service::{ServiceError, ServiceResult, WalletService};
pub use types::{
    BalanceResponse, Balances, DiscoveryResult, Keys, MessageOutput, NodeInfo, OperationKind,
    TransactionRecord, TransferReceipt, TransferResult,
};
