//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the node repo; also handed to a relaunched daemon
pub const REPO_PATH_ENV: &str = "BTFS_PATH";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Node repo directory (holds the JSON node config)
    #[serde(default = "default_repo_path")]
    pub path: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// File this configuration was loaded from
    #[serde(skip)]
    pub source: PathBuf,
}

/// Node HTTP API the wallet service lives behind
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Pending destination for the repo; empty means no relocation is queued
    #[serde(default)]
    pub store_path: String,
    /// Durable record of the repo location, rewritten after a relocation
    #[serde(default = "default_properties_file")]
    pub properties_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: String::new(),
            properties_file: default_properties_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Node daemon binary; found on `PATH` as `btfs` when empty
    #[serde(default)]
    pub executable: String,
    /// How long a restart waits for the old daemon to stop
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            executable: String::new(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

fn default_repo_path() -> String {
    "~/.btfs".to_string()
}

fn default_api_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_shutdown_timeout_ms() -> u64 {
    30_000
}

/// Name of the node daemon binary
const DAEMON_BINARY: &str = "btfs";

fn default_properties_file() -> String {
    "~/.btfs.properties".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Precedence, lowest first: defaults, the config file, the properties
    /// file written by a previous relocation, then `BTFS_*` variables.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Config::load`], reading variables from `env` instead of the
    /// process environment when given
    pub fn load_with_env<P: AsRef<Path>>(
        path: P,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let path = path.as_ref();

        // First pass only locates the properties file
        let base = Self::builder(path, None, env.clone())?
            .build()
            .context("Failed to build configuration")?;
        let properties = base
            .get_string("storage.properties_file")
            .unwrap_or_else(|_| default_properties_file());
        let properties = expand_home(&properties);

        let settings = Self::builder(path, Some(&properties), env)?
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.source = path.to_path_buf();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    fn builder(
        path: &Path,
        properties: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let mut builder = config::Config::builder()
            // Start with defaults
            .set_default("path", default_repo_path())?
            .set_default("api.url", default_api_url())?
            .set_default("api.timeout_ms", default_timeout_ms() as i64)?
            .set_default("api.max_retries", default_max_retries() as i64)?
            .set_default("storage.properties_file", default_properties_file())?
            // Load from file if exists
            .add_source(config::File::from(path).required(false));

        // Repo location recorded by the last relocation
        if let Some(properties) = properties {
            builder = builder.add_source(
                config::File::from(properties)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        // Override with environment variables (BTFS_PATH, BTFS_API__URL, ...)
        Ok(builder.add_source(
            config::Environment::with_prefix("BTFS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        ))
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            anyhow::bail!("repo path must not be empty");
        }

        let url = url::Url::parse(&self.api.url)
            .with_context(|| format!("Invalid api.url: {}", self.api.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("api.url must use http or https, got {}", url.scheme());
        }

        if self.api.timeout_ms == 0 {
            anyhow::bail!("api.timeout_ms must be positive");
        }

        if self.daemon.shutdown_timeout_ms == 0 {
            anyhow::bail!("daemon.shutdown_timeout_ms must be positive");
        }

        Ok(())
    }

    /// Current repo directory with `~` expanded
    pub fn repo_path(&self) -> PathBuf {
        expand_home(&self.path)
    }

    /// Pending relocation target
    ///
    /// `None` when nothing is queued or the repo already lives there.
    pub fn store_path(&self) -> Option<PathBuf> {
        let trimmed = self.storage.store_path.trim();
        if trimmed.is_empty() {
            return None;
        }
        let target = expand_home(trimmed);
        (target != self.repo_path()).then_some(target)
    }

    pub fn properties_path(&self) -> PathBuf {
        expand_home(&self.storage.properties_file)
    }

    /// Node daemon binary started by a restart
    ///
    /// `daemon.executable` when set, otherwise the first `btfs` on `PATH`
    /// that is not this wallet CLI.
    pub fn executable(&self) -> Result<PathBuf> {
        if !self.daemon.executable.is_empty() {
            return Ok(expand_home(&self.daemon.executable));
        }

        let search = std::env::var_os("PATH").unwrap_or_default();
        let this = std::env::current_exe().and_then(|p| p.canonicalize()).ok();
        find_daemon_binary(&search, this.as_deref()).with_context(|| {
            format!(
                "No {} daemon binary found on PATH; set daemon.executable (BTFS_DAEMON__EXECUTABLE)",
                DAEMON_BINARY
            )
        })
    }

    /// Command that reruns this CLI's `restart` against the same config
    pub fn restart_command(&self) -> Result<(PathBuf, Vec<String>)> {
        let exe = std::env::current_exe().context("Failed to resolve current executable")?;
        let args = vec![
            "--config".to_string(),
            self.source.to_string_lossy().into_owned(),
            "restart".to_string(),
        ];
        Ok((exe, args))
    }

    /// Get configuration for display
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  repo path: {}
  API:
    url: {}
    timeout: {}ms
    max_retries: {}
  Storage:
    store_path: {}
    properties_file: {}
  Daemon:
    executable: {}
    shutdown_timeout: {}ms
"#,
            self.repo_path().display(),
            mask_url(&self.api.url),
            self.api.timeout_ms,
            self.api.max_retries,
            if self.storage.store_path.is_empty() {
                "(not set)"
            } else {
                self.storage.store_path.as_str()
            },
            self.properties_path().display(),
            if self.daemon.executable.is_empty() {
                "(btfs on PATH)"
            } else {
                self.daemon.executable.as_str()
            },
            self.daemon.shutdown_timeout_ms,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: default_repo_path(),
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            daemon: DaemonConfig::default(),
            source: PathBuf::from("btfs.toml"),
        }
    }
}

/// First `btfs` file in the `PATH`-style `search` list other than `exclude`
fn find_daemon_binary(search: &std::ffi::OsStr, exclude: Option<&Path>) -> Option<PathBuf> {
    std::env::split_paths(search)
        .map(|dir| dir.join(DAEMON_BINARY))
        .filter(|candidate| candidate.is_file())
        .find(|candidate| match (exclude, candidate.canonicalize()) {
            (Some(exclude), Ok(resolved)) => resolved != exclude,
            _ => true,
        })
}

/// Expand a leading `~` to `$HOME`
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            let rest = rest.trim_start_matches('/');
            return if rest.is_empty() {
                PathBuf::from(home)
            } else {
                Path::new(&home).join(rest)
            };
        }
    }
    PathBuf::from(path)
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}
