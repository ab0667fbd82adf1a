//! Password gate and password-set transition
//!
//! Every funds-moving or key-revealing wallet command runs [`validate`]
//! before it talks to the wallet service. [`set_password`] is the only code
//! that writes the encrypted identity fields.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::repo::{ConfigStore, NodeConfig};

use super::crypto::{decrypt_with_aes, encrypt_with_aes};

/// Check that `password` unlocks `encrypted_key` to exactly `reference_key`
pub fn validate(encrypted_key: &str, reference_key: &str, password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::MissingPassword);
    }

    match decrypt_with_aes(password, encrypted_key) {
        Ok(plain) if plain == reference_key => {
            debug!("Wallet password accepted");
            Ok(())
        }
        Ok(_) => {
            warn!("Wallet password decrypted to a different key");
            Err(Error::IncorrectPassword)
        }
        Err(e) => {
            debug!("Wallet password rejected: {}", e);
            Err(Error::IncorrectPassword)
        }
    }
}

/// Run the gate against the credentials held in `config`
pub fn validate_config(config: &NodeConfig, password: &str) -> Result<()> {
    validate(
        &config.identity.encrypted_priv_key,
        &config.identity.priv_key,
        password,
    )
}

/// Encrypt the identity secrets in place and mark the wallet initialized
///
/// Fails with `AlreadyInitialized` once a password has been set.
pub fn seal_identity(config: &mut NodeConfig, password: &str) -> Result<()> {
    if config.is_wallet_initialized() {
        return Err(Error::AlreadyInitialized(
            "Already init, cannot set password again.".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(Error::MissingPassword);
    }

    let cipher_mnemonic = encrypt_with_aes(password, &config.identity.mnemonic)?;
    let cipher_priv_key = encrypt_with_aes(password, &config.identity.priv_key)?;

    config.identity.encrypted_mnemonic = cipher_mnemonic;
    config.identity.encrypted_priv_key = cipher_priv_key;
    config.identity.mnemonic.clear();
    config.ui.wallet.initialized = true;
    Ok(())
}

/// Set the wallet password and persist the sealed configuration
pub fn set_password(store: &dyn ConfigStore, password: &str) -> Result<()> {
    let mut config = store.load()?;
    seal_identity(&mut config, password)?;
    store.store(&config)?;

    info!("Wallet password set");
    Ok(())
}
