//! CLI command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dialoguer::Password;
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::repo::FileConfigStore;
use crate::restart::{
    DetachedLauncher, FsRelocator, LaunchRequest, RestartIntent, RestartOutcome, RestartSequencer,
};
use crate::wallet::{HttpWalletService, WalletManager};

/// Wire the manager to the repo on disk and the node API
fn wallet_manager(config: &Config) -> Result<WalletManager> {
    let store = Arc::new(FileConfigStore::open(&config.repo_path()));
    let service = Arc::new(HttpWalletService::new(config.api.clone())?);
    let (exe, args) = config.restart_command()?;
    let mut restart = LaunchRequest::new(exe, args);
    let repo = config.repo_path();
    if repo.is_dir() {
        restart = restart.with_log(repo.join("restart.log"));
    }

    Ok(WalletManager::new(
        store,
        service,
        Arc::new(DetachedLauncher::default()),
        restart,
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Init BTFS wallet
pub async fn wallet_init(config: &Config) -> Result<()> {
    let out = wallet_manager(config)?.init().await?;
    println!("{}", out);
    Ok(())
}

/// Deposit from chain to ledger
pub async fn wallet_deposit(
    config: &Config,
    amount: &str,
    async_submit: bool,
    password: Option<String>,
) -> Result<()> {
    let out = wallet_manager(config)?
        .deposit(amount, async_submit, password.as_deref().unwrap_or_default())
        .await?;
    println!("{}", out);
    Ok(())
}

/// Withdraw from ledger to chain
pub async fn wallet_withdraw(config: &Config, amount: &str, password: Option<String>) -> Result<()> {
    let out = wallet_manager(config)?
        .withdraw(amount, password.as_deref().unwrap_or_default())
        .await?;
    println!("{}", out);
    Ok(())
}

/// Query ledger and chain balance
pub async fn wallet_balance(config: &Config) -> Result<()> {
    let balance = wallet_manager(config)?.balance().await?;
    print_json(&balance)
}

/// Set the wallet password, prompting when not given
pub async fn wallet_password(config: &Config, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("New wallet password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    let out = wallet_manager(config)?.set_password(&password)?;
    println!("{}", out);
    Ok(())
}

/// Check the wallet password
pub async fn wallet_validate_password(config: &Config, password: Option<String>) -> Result<()> {
    let out = wallet_manager(config)?.validate_password(password.as_deref().unwrap_or_default())?;
    println!("{}", out);
    Ok(())
}

/// Show wallet keys
pub async fn wallet_keys(config: &Config, password: Option<String>) -> Result<()> {
    let keys = wallet_manager(config)?.keys(password.as_deref().unwrap_or_default())?;
    print_json(&keys)
}

/// Show wallet transaction history
pub async fn wallet_transactions(config: &Config) -> Result<()> {
    let txs = wallet_manager(config)?.transactions().await?;
    print_json(&txs)
}

/// Import a private key and/or mnemonic
pub async fn wallet_import(
    config: &Config,
    private_key: Option<String>,
    mnemonic: Option<String>,
) -> Result<()> {
    let out = wallet_manager(config)?
        .import(
            private_key.as_deref().unwrap_or_default(),
            mnemonic.as_deref().unwrap_or_default(),
        )
        .await?;
    println!("{}", out);
    Ok(())
}

/// Send µBTT to another wallet
pub async fn wallet_transfer(
    config: &Config,
    to: &str,
    amount: &str,
    password: Option<String>,
) -> Result<()> {
    let result = wallet_manager(config)?
        .transfer(to, amount, password.as_deref().unwrap_or_default())
        .await?;
    print_json(&result)
}

/// Speed wallet discovery
pub async fn wallet_discovery(config: &Config) -> Result<()> {
    let result = wallet_manager(config)?.discovery().await?;
    print_json(&result)
}

/// Restart the daemon, applying a pending repo path if asked
///
/// Returns the hand-off; exiting is up to the caller.
pub async fn restart(config: &Config, post_path_modification: bool) -> Result<RestartOutcome> {
    let intent = RestartIntent {
        post_path_modification,
        origin: Some(config.repo_path()),
        destination: config.store_path(),
    };

    // Resolve before anything is stopped
    let executable = config.executable()?;
    info!("Daemon binary: {}", executable.display());

    let control = HttpWalletService::new(config.api.clone())?;
    let relocator = FsRelocator::new(config.properties_path());
    let launcher = DetachedLauncher::default();

    let mut sequencer = RestartSequencer::new(&control, &relocator, &launcher)
        .with_shutdown_timing(
            Duration::from_millis(config.daemon.shutdown_timeout_ms),
            Duration::from_millis(250),
        );
    let outcome = sequencer.run(&intent, &executable).await?;

    info!("Restart handed off: {:?}", outcome);
    Ok(outcome)
}
