//! Wallet manager - core wallet operations
//!
//! Coordinates the node config, the password gate and the wallet service.
//! Funds-moving and key-revealing operations always run the gate before the
//! service is called.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::repo::ConfigStore;
use crate::restart::{LaunchRequest, ProcessLauncher};

use super::credentials;
use super::service::WalletService;
use super::types::{
    BalanceResponse, DiscoveryResult, Keys, MessageOutput, OperationKind, TransactionRecord,
    TransferResult,
};

const DEPOSIT_SUBMITTED: &str =
    "BTFS wallet deposit submitted. Please wait one minute for the transaction to confirm.";
const DEPOSIT_DONE: &str = "BTFS wallet deposit Done.";
const WITHDRAW_SUBMITTED: &str =
    "BTFS wallet withdraw submitted. Please wait one minute for the transaction to confirm.";

/// Parse a µBTT amount argument
pub fn parse_amount(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| Error::InvalidAmount(raw.to_string()))
}

/// Core wallet manager
pub struct WalletManager {
    /// Node configuration (credentials, wallet flag)
    store: Arc<dyn ConfigStore>,

    /// Ledger / chain operations
    service: Arc<dyn WalletService>,

    /// Starts the follow-up restart after a key import
    launcher: Arc<dyn ProcessLauncher>,

    /// Request used for that restart
    restart_request: LaunchRequest,
}

impl WalletManager {
    /// Create a new wallet manager
    pub fn new(
        store: Arc<dyn ConfigStore>,
        service: Arc<dyn WalletService>,
        launcher: Arc<dyn ProcessLauncher>,
        restart_request: LaunchRequest,
    ) -> Self {
        Self {
            store,
            service,
            launcher,
            restart_request,
        }
    }

    /// Load the node config and run the password gate against it
    fn unlock(&self, password: &str) -> Result<()> {
        let config = self.store.load()?;
        credentials::validate_config(&config, password)
    }

    /// Initialize the node wallet
    pub async fn init(&self) -> Result<MessageOutput> {
        self.service.init().await?;
        info!("BTFS wallet initialized");
        Ok(MessageOutput::new("BTFS wallet initialized."))
    }

    /// Deposit from chain to ledger
    pub async fn deposit(
        &self,
        amount: &str,
        async_submit: bool,
        password: &str,
    ) -> Result<MessageOutput> {
        let amount = parse_amount(amount)?;
        self.unlock(password)?;

        let node = self.service.node_info().await?;
        let run_daemon = node.is_daemon;

        self.service
            .deposit(amount, async_submit, password)
            .await
            .map_err(|e| e.into_command_error(OperationKind::Deposit))?;

        info!(
            "Deposit of {}µBTT accepted (daemon: {}, async: {})",
            amount, run_daemon, async_submit
        );

        let message = if run_daemon || async_submit {
            DEPOSIT_SUBMITTED
        } else {
            DEPOSIT_DONE
        };
        Ok(MessageOutput::new(message))
    }

    /// Withdraw from ledger to chain
    pub async fn withdraw(&self, amount: &str, password: &str) -> Result<MessageOutput> {
        let amount = parse_amount(amount)?;
        self.unlock(password)?;

        self.service
            .withdraw(amount, password)
            .await
            .map_err(|e| e.into_command_error(OperationKind::Withdraw))?;

        info!("Withdrawal of {}µBTT submitted", amount);
        Ok(MessageOutput::new(WITHDRAW_SUBMITTED))
    }

    /// Query ledger and chain balances
    pub async fn balance(&self) -> Result<BalanceResponse> {
        let balances = self.service.balance().await.map_err(|e| {
            warn!("wallet get balance failed: {}", e);
            Error::from(e)
        })?;

        info!(
            "BTFS wallet tron balance '{}', ledger balance '{}'",
            balances.chain_balance, balances.ledger_balance
        );

        Ok(BalanceResponse {
            btfs_wallet_balance: balances.ledger_balance.max(0) as u64,
            btt_wallet_balance: balances.chain_balance.max(0) as u64,
        })
    }

    /// Set the wallet password (once)
    pub fn set_password(&self, password: &str) -> Result<MessageOutput> {
        credentials::set_password(self.store.as_ref(), password)?;
        Ok(MessageOutput::new("Password set."))
    }

    /// Check a password without doing anything else
    pub fn validate_password(&self, password: &str) -> Result<MessageOutput> {
        self.unlock(password)?;
        Ok(MessageOutput::new("Password is correct."))
    }

    /// Wallet keys
    ///
    /// Before a password is set there is nothing to gate on and the plaintext
    /// keys are returned. After, the password must unlock and the encrypted
    /// keys are returned.
    pub fn keys(&self, password: &str) -> Result<Keys> {
        let config = self.store.load()?;

        if !config.is_wallet_initialized() {
            return Ok(Keys {
                private_key: config.identity.priv_key,
                mnemonic: config.identity.mnemonic,
            });
        }

        credentials::validate_config(&config, password)?;
        Ok(Keys {
            private_key: config.identity.encrypted_priv_key,
            mnemonic: config.identity.encrypted_mnemonic,
        })
    }

    /// Transaction history of this node
    pub async fn transactions(&self) -> Result<Vec<TransactionRecord>> {
        let node = self.service.node_info().await?;
        Ok(self.service.transactions(&node.peer_id).await?)
    }

    /// Send µBTT to another wallet
    pub async fn transfer(&self, to: &str, amount: &str, password: &str) -> Result<TransferResult> {
        let amount = parse_amount(amount)?;
        self.unlock(password)?;

        let receipt = self
            .service
            .transfer(to, amount, password)
            .await
            .map_err(|e| e.into_passthrough_error())?;
        info!("Transfer of {}µBTT to {} sent as {}", amount, to, receipt.tx_id);

        Ok(TransferResult {
            result: receipt.result,
            message: format!("transaction {} sent", receipt.tx_id),
        })
    }

    /// Import keys, then restart the daemon so it picks them up
    pub async fn import(&self, private_key: &str, mnemonic: &str) -> Result<MessageOutput> {
        if private_key.is_empty() && mnemonic.is_empty() {
            return Err(Error::Config(
                "either --private-key or --mnemonic is required".to_string(),
            ));
        }

        self.service.import_keys(private_key, mnemonic).await?;
        info!("Wallet keys imported, restarting daemon");

        // The import already succeeded; a failed restart is reported, not fatal
        match self.launcher.spawn(&self.restart_request) {
            Ok(pid) => {
                info!("Restart started (pid {})", pid);
                Ok(MessageOutput::new("Keys imported. Restarting daemon."))
            }
            Err(e) => {
                warn!("restart error, {}", e);
                Ok(MessageOutput::new(format!(
                    "Keys imported. Restart failed ({}), please restart the daemon manually.",
                    e
                )))
            }
        }
    }

    /// Speed wallet discovery key, only before initialization
    pub async fn discovery(&self) -> Result<DiscoveryResult> {
        let config = self.store.load()?;
        if config.is_wallet_initialized() {
            return Err(Error::AlreadyInitialized(
                "Already init, cannot discovery.".to_string(),
            ));
        }

        let key = self.service.discovery_key().await?;
        Ok(DiscoveryResult { key })
    }
}
