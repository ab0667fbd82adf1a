//! BTFS wallet CLI - password-gated wallet commands and daemon restart
//!
//! # WARNING
//! - Deposits, withdrawals and transfers move real BTT.
//! - The wallet password cannot be changed once set. Keep it safe.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use btfs_wallet::cli::commands;
use btfs_wallet::config::Config;
use btfs_wallet::Error;
use btfs_wallet::repo::CONFIG_FILE_NAME;

/// BTFS storage node wallet
#[derive(Parser)]
#[command(name = "btfs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "btfs.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interact with the BTFS wallet
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// Restart the daemon
    Restart {
        /// Move the repo to the pending storage path before restarting
        #[arg(short = 'p', long = "post-path-modification")]
        post_path_modification: bool,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum WalletAction {
    /// Init BTFS wallet
    Init,

    /// BTFS wallet deposit from chain to ledger
    Deposit {
        /// Amount of µBTT (=0.000001BTT) to deposit
        amount: String,

        /// Return once the transaction is submitted
        #[arg(short = 'a', long = "async")]
        async_submit: bool,

        /// Wallet password
        #[arg(short, long)]
        password: Option<String>,
    },

    /// BTFS wallet withdraw from ledger to chain
    Withdraw {
        /// Amount of µBTT (=0.000001BTT) to withdraw
        amount: String,

        /// Wallet password
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Get BTFS wallet balance
    Balance,

    /// Set password for BTFS wallet
    Password {
        /// Password to set; prompted for when omitted
        password: Option<String>,
    },

    /// Get keys of the BTFS wallet
    Keys {
        /// Wallet password
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Get BTFS wallet transactions
    Transactions,

    /// Import BTFS wallet keys and restart the daemon
    Import {
        /// Private key
        #[arg(short = 'p', long = "private-key", alias = "privateKey")]
        private_key: Option<String>,

        /// Mnemonic
        #[arg(short, long)]
        mnemonic: Option<String>,
    },

    /// Send µBTT to another BTT wallet
    Transfer {
        /// Target BTT address
        to: String,

        /// Amount of µBTT (=0.000001BTT) to send
        amount: String,

        /// Wallet password
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Speed wallet discovery
    Discovery,

    /// Validate the wallet password
    #[command(name = "validate_password")]
    ValidatePassword {
        /// Wallet password
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("btfs_wallet=info".parse()?)
                .add_directive("btfs=info".parse()?),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    startup_checks(&config);

    let result = match cli.command {
        Commands::Config => commands::show_config(&config),
        Commands::Restart {
            post_path_modification,
        } => match commands::restart(&config, post_path_modification).await {
            Ok(outcome) => {
                info!("New daemon started, exiting");
                std::process::exit(outcome.exit_code());
            }
            Err(e) => {
                if e
                    .downcast_ref::<Error>()
                    .is_some_and(|e| e.is_restart_failure())
                {
                    warn!(
                        "Restart did not complete; no daemon may be running. Check {} and start it manually",
                        config.repo_path().display()
                    );
                }
                Err(e)
            }
        },
        Commands::Wallet { action } => match action {
            WalletAction::Init => commands::wallet_init(&config).await,
            WalletAction::Deposit {
                amount,
                async_submit,
                password,
            } => commands::wallet_deposit(&config, &amount, async_submit, password).await,
            WalletAction::Withdraw { amount, password } => {
                commands::wallet_withdraw(&config, &amount, password).await
            }
            WalletAction::Balance => commands::wallet_balance(&config).await,
            WalletAction::Password { password } => {
                commands::wallet_password(&config, password).await
            }
            WalletAction::Keys { password } => commands::wallet_keys(&config, password).await,
            WalletAction::Transactions => commands::wallet_transactions(&config).await,
            WalletAction::Import {
                private_key,
                mnemonic,
            } => commands::wallet_import(&config, private_key, mnemonic).await,
            WalletAction::Transfer {
                to,
                amount,
                password,
            } => commands::wallet_transfer(&config, &to, &amount, password).await,
            WalletAction::Discovery => commands::wallet_discovery(&config).await,
            WalletAction::ValidatePassword { password } => {
                commands::wallet_validate_password(&config, password).await
            }
        },
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Warn about repo state that should be fixed but does not block commands
fn startup_checks(config: &Config) {
    let node_config = config.repo_path().join(CONFIG_FILE_NAME);

    // Repo config carries the node keys (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(&node_config) {
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                warn!(
                    "{} is readable by other users (mode {:o}). Run: chmod 600 {}",
                    node_config.display(),
                    mode & 0o777,
                    node_config.display()
                );
            }
        }
    }

    if !node_config.exists() {
        warn!(
            "No node config at {}, wallet commands will fail until the repo is initialized",
            node_config.display()
        );
    }
}
