//! HTTP client for the node wallet API
//!
//! Commands are sent the way the node API expects them: `POST
//! /api/v1/<command path>` with positional arguments as repeated `arg`
//! query parameters and options as named query parameters.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::restart::DaemonControl;

use super::service::{ServiceError, ServiceResult, WalletService};
use super::types::{Balances, NodeInfo, OperationKind, TransactionRecord, TransferReceipt};

/// Option the node reads the wallet password from
const PASSWORD_OPTION: &str = "password";

/// Error body returned by the node API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    kind: Option<OperationKind>,
    #[serde(default)]
    minimum: Option<i64>,
}

impl ApiErrorBody {
    fn into_service_error(self) -> ServiceError {
        if let (Some(kind), Some("below_minimum")) =
            (self.kind, self.code.as_ref().and_then(|c| c.as_str()))
        {
            return ServiceError::BelowMinimum {
                kind,
                minimum: self.minimum.unwrap_or_else(|| kind.minimum()),
            };
        }
        ServiceError::classify(self.message)
    }
}

#[derive(Debug, Deserialize)]
struct IdOutput {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BalanceOutput {
    btfs_wallet_balance: i64,
    btt_wallet_balance: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TransferOutput {
    result: bool,
    #[serde(default)]
    tx_id: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DiscoveryOutput {
    key: String,
}

/// Wallet service reached over the node HTTP API
pub struct HttpWalletService {
    client: Client,
    base: Url,
    config: ApiConfig,
}

impl HttpWalletService {
    /// Create a client for the API at `config.url`
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut base = Url::parse(&config.url)
            .map_err(|e| Error::Config(format!("Invalid api url {}: {}", config.url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        info!("Wallet API client initialized for {}", base);

        Ok(Self {
            client,
            base,
            config,
        })
    }

    fn endpoint(&self, command: &str, args: &[&str], options: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .base
            .join(&format!("api/v1/{}", command))
            .map_err(|e| Error::Config(format!("Invalid command path {}: {}", command, e)))?;
        {
            let mut query = url.query_pairs_mut();
            for arg in args {
                query.append_pair("arg", arg);
            }
            for (name, value) in options {
                query.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// Single attempt
    async fn call<T: DeserializeOwned>(
        &self,
        command: &str,
        args: &[&str],
        options: &[(&str, String)],
    ) -> ServiceResult<T> {
        let url = self
            .endpoint(command, args, options)
            .map_err(|e| ServiceError::Rejected(e.to_string()))?;
        debug!("POST /api/v1/{}", command);

        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| ServiceError::Unavailable(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Unavailable(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let error = serde_json::from_slice::<ApiErrorBody>(&body)
                .map(ApiErrorBody::into_service_error)
                .unwrap_or_else(|_| {
                    ServiceError::classify(String::from_utf8_lossy(&body).trim().to_string())
                });
            debug!("/api/v1/{} failed with {}: {}", command, status, error);
            return Err(error);
        }

        // Commands without output answer with an empty body
        let body: &[u8] = if body.is_empty() { b"null" } else { &body };
        serde_json::from_slice(body)
            .map_err(|e| ServiceError::Rejected(format!("Failed to parse response: {}", e)))
    }

    /// Retry idempotent reads while the node is unreachable
    async fn call_with_retry<T: DeserializeOwned>(
        &self,
        command: &str,
        args: &[&str],
    ) -> ServiceResult<T> {
        let base_delay = Duration::from_millis(self.config.retry_base_delay_ms);
        let backoff = ExponentialBackoff {
            initial_interval: base_delay,
            max_interval: base_delay * 4,
            max_elapsed_time: Some(base_delay * 4 * self.config.max_retries.max(1)),
            ..Default::default()
        };

        retry(backoff, || async {
            match self.call(command, args, &[]).await {
                Ok(result) => Ok(result),
                Err(e @ ServiceError::Unavailable(_)) => {
                    warn!("Retryable wallet API error: {}", e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }
}

#[async_trait]
impl WalletService for HttpWalletService {
    /// Node identity
    ///
    /// Every command this client sends is executed by the daemon behind the
    /// API, so `is_daemon` is always set and deposits report "submitted".
    /// The "Done" wording only comes from delegates that run in-process.
    async fn node_info(&self) -> ServiceResult<NodeInfo> {
        let id: IdOutput = self.call_with_retry("id", &[]).await?;
        Ok(NodeInfo {
            peer_id: id.id,
            is_daemon: true,
        })
    }

    async fn init(&self) -> ServiceResult<()> {
        let _: serde_json::Value = self.call("wallet/init", &[], &[]).await?;
        Ok(())
    }

    async fn deposit(&self, amount: i64, async_submit: bool, password: &str) -> ServiceResult<()> {
        let amount = amount.to_string();
        let _: serde_json::Value = self
            .call(
                "wallet/deposit",
                &[&amount],
                &[
                    ("async", async_submit.to_string()),
                    (PASSWORD_OPTION, password.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn withdraw(&self, amount: i64, password: &str) -> ServiceResult<()> {
        let amount = amount.to_string();
        let _: serde_json::Value = self
            .call(
                "wallet/withdraw",
                &[&amount],
                &[(PASSWORD_OPTION, password.to_string())],
            )
            .await?;
        Ok(())
    }

    async fn balance(&self) -> ServiceResult<Balances> {
        let out: BalanceOutput = self.call_with_retry("wallet/balance", &[]).await?;
        Ok(Balances {
            chain_balance: out.btt_wallet_balance,
            ledger_balance: out.btfs_wallet_balance,
        })
    }

    async fn transfer(
        &self,
        to: &str,
        amount: i64,
        password: &str,
    ) -> ServiceResult<TransferReceipt> {
        let amount = amount.to_string();
        let out: TransferOutput = self
            .call(
                "wallet/transfer",
                &[to, &amount],
                &[(PASSWORD_OPTION, password.to_string())],
            )
            .await?;

        // Older nodes only report "transaction <id> sent"
        let tx_id = if out.tx_id.is_empty() {
            out.message
                .strip_prefix("transaction ")
                .and_then(|rest| rest.strip_suffix(" sent"))
                .unwrap_or_default()
                .to_string()
        } else {
            out.tx_id
        };

        Ok(TransferReceipt {
            tx_id,
            result: out.result,
        })
    }

    async fn transactions(&self, _peer_id: &str) -> ServiceResult<Vec<TransactionRecord>> {
        // The node scopes history to its own identity
        let records: Option<Vec<TransactionRecord>> =
            self.call_with_retry("wallet/transactions", &[]).await?;
        Ok(records.unwrap_or_default())
    }

    async fn import_keys(&self, private_key: &str, mnemonic: &str) -> ServiceResult<()> {
        let mut options = Vec::new();
        if !private_key.is_empty() {
            options.push(("privateKey", private_key.to_string()));
        }
        if !mnemonic.is_empty() {
            options.push(("mnemonic", mnemonic.to_string()));
        }
        let _: serde_json::Value = self.call("wallet/import", &[], &options).await?;
        Ok(())
    }

    async fn discovery_key(&self) -> ServiceResult<String> {
        let out: DiscoveryOutput = self.call("wallet/discovery", &[], &[]).await?;
        Ok(out.key)
    }
}

#[async_trait]
impl DaemonControl for HttpWalletService {
    async fn is_running(&self) -> bool {
        // Any answer, even an error body, means something is serving the API
        !matches!(
            self.call::<serde_json::Value>("id", &[], &[]).await,
            Err(ServiceError::Unavailable(_))
        )
    }

    async fn shutdown(&self) -> Result<()> {
        match self.call::<serde_json::Value>("shutdown", &[], &[]).await {
            Ok(_) => Ok(()),
            // The daemon may drop the connection while going down
            Err(ServiceError::Unavailable(msg)) => {
                debug!("Shutdown request interrupted: {}", msg);
                Ok(())
            }
            Err(e) => Err(Error::ShutdownFailure(e.to_string())),
        }
    }
}
