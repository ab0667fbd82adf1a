//! Node repo configuration
//!
//! The daemon keeps its configuration as JSON at `<repo>/config`. The wallet
//! commands only touch the identity keys and the UI wallet flag; every other
//! section is carried through untouched on rewrite.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// File name of the node config inside the repo directory
pub const CONFIG_FILE_NAME: &str = "config";

/// Node configuration as stored in the repo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(rename = "Identity", default)]
    pub identity: Identity,

    #[serde(rename = "UI", default)]
    pub ui: UiConfig,

    /// Sections owned by other subsystems
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Node identity and wallet credentials
///
/// Before a password is set the plaintext fields are authoritative. After,
/// the encrypted fields are; `priv_key` stays as the node identity key and is
/// the reference the password gate compares against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "PeerID", default)]
    pub peer_id: String,

    #[serde(rename = "PrivKey", default)]
    pub priv_key: String,

    #[serde(rename = "Mnemonic", default)]
    pub mnemonic: String,

    #[serde(rename = "EncryptedPrivKey", default)]
    pub encrypted_priv_key: String,

    #[serde(rename = "EncryptedMnemonic", default)]
    pub encrypted_mnemonic: String,

    /// Other identity material (`HexPrivKey`, ...), kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(rename = "Wallet", default)]
    pub wallet: WalletUiConfig,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletUiConfig {
    #[serde(rename = "Initialized", default)]
    pub initialized: bool,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeConfig {
    pub fn is_wallet_initialized(&self) -> bool {
        self.ui.wallet.initialized
    }
}

/// Read/write access to the node configuration
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<NodeConfig>;

    fn store(&self, config: &NodeConfig) -> Result<()>;
}

/// Config store backed by `<repo>/config`
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store for the repo rooted at `repo_path`
    pub fn open(repo_path: &Path) -> Self {
        Self {
            path: repo_path.join(CONFIG_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<NodeConfig> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::ConfigIo(format!(
                "Failed to read node config {}: {}. Is the repo initialized?",
                self.path.display(),
                e
            ))
        })?;

        let config = serde_json::from_str::<NodeConfig>(&content).map_err(|e| {
            Error::Deserialization(format!(
                "Failed to parse node config {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("Loaded node config from {}", self.path.display());
        Ok(config)
    }

    fn store(&self, config: &NodeConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;

        // Write beside the target and rename so a crash never leaves half a config
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| Error::ConfigIo(format!("Failed to write {}: {}", tmp.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&tmp, perms).map_err(|e| {
                Error::ConfigIo(format!("Failed to restrict {}: {}", tmp.display(), e))
            })?;
        }

        std::fs::rename(&tmp, &self.path).map_err(|e| {
            Error::ConfigIo(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        info!("Saved node config");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "Identity": {
            "PeerID": "16Uiu2HAmPeer",
            "PrivKey": "CAISIBase64Key",
            "HexPrivKey": "08021220deadbeef",
            "Mnemonic": "wrist tide orbit"
        },
        "UI": {
            "Wallet": { "Initialized": false },
            "Host": { "Initialized": true }
        },
        "Addresses": { "API": "/ip4/127.0.0.1/tcp/5001" }
    }"#;

    #[test]
    fn test_load_node_config() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), SAMPLE).unwrap();

        let store = FileConfigStore::open(dir.path());
        let config = store.load().unwrap();

        assert_eq!(config.identity.peer_id, "16Uiu2HAmPeer");
        assert_eq!(config.identity.mnemonic, "wrist tide orbit");
        assert!(config.identity.encrypted_priv_key.is_empty());
        assert!(!config.is_wallet_initialized());
    }

    #[test]
    fn test_store_preserves_foreign_sections() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), SAMPLE).unwrap();

        let store = FileConfigStore::open(dir.path());
        let mut config = store.load().unwrap();
        config.ui.wallet.initialized = true;
        store.store(&config).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["Addresses"]["API"], "/ip4/127.0.0.1/tcp/5001");
        assert_eq!(raw["UI"]["Host"]["Initialized"], true);
        assert_eq!(raw["UI"]["Wallet"]["Initialized"], true);

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_set_password_keeps_other_identity_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), SAMPLE).unwrap();

        let store = FileConfigStore::open(dir.path());
        crate::wallet::credentials::set_password(&store, "s3cret").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["Identity"]["HexPrivKey"], "08021220deadbeef");
        assert_eq!(raw["Identity"]["PrivKey"], "CAISIBase64Key");
        assert_eq!(raw["Identity"]["Mnemonic"], "");
        assert_eq!(raw["UI"]["Wallet"]["Initialized"], true);
        assert_eq!(raw["Addresses"]["API"], "/ip4/127.0.0.1/tcp/5001");

        let sealed = store.load().unwrap();
        assert!(crate::wallet::credentials::validate_config(&sealed, "s3cret").is_ok());
    }

    #[test]
    fn test_missing_config_is_config_io_error() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::open(dir.path());
        assert!(matches!(store.load(), Err(Error::ConfigIo(_))));
    }
}
