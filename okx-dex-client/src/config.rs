//! Client configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! api_key = "$OKX_API_KEY"
//! secret_key = "$OKX_SECRET_KEY"
//! passphrase = "$OKX_API_PASSPHRASE"
//! project_id = "$OKX_PROJECT_ID"
//!
//! [chains."8453"]
//! rpc_url = "https://mainnet.base.org"
//! private_key = "$EVM_PRIVATE_KEY"
//!
//! [chains."501"]
//! rpc_url = "https://api.mainnet-beta.solana.com"
//! private_key = "${SOLANA_PRIVATE_KEY}"
//! confirm_timeout_secs = 60
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the configuration file (default: `okx-dex.toml`)
//! - `OKX_API_KEY`, `OKX_SECRET_KEY`, `OKX_API_PASSPHRASE`, `OKX_PROJECT_ID`,
//!   `HTTP_PROXY` - Override the `[api]` values
//! - Keys referenced by `$VAR` in the config file

use okx_dex::chain::ChainIndex;
use okx_dex::signer::SignerKey;
use okx_dex_http::{ApiClientError, Credentials, OkxApiClient};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "okx-dex.toml";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or does not match the schema.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexConfig {
    /// Aggregator access.
    #[serde(default)]
    pub api: ApiConfig,

    /// Execution settings keyed by aggregator chain index.
    #[serde(default)]
    pub chains: HashMap<ChainIndex, ChainConfig>,
}

/// Aggregator credentials and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key.
    #[serde(default)]
    pub api_key: String,
    /// Secret used to sign requests.
    #[serde(default)]
    pub secret_key: String,
    /// API passphrase.
    #[serde(default)]
    pub passphrase: String,
    /// Optional project identifier.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Aggregator base URL (default: `https://web3.okx.com`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional HTTP proxy for aggregator requests.
    #[serde(default)]
    pub http_proxy: Option<String>,
    /// Request timeout in seconds (default: `30`).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Per-chain execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// RPC endpoint URL.
    pub rpc_url: String,

    /// Default signing key (hex on EVM chains, base58 keypair on Solana).
    /// Supports `$VAR` / `${VAR}` for environment variable expansion.
    #[serde(default)]
    pub private_key: Option<String>,

    /// EVM receipt wait bound in seconds (default: `120`).
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    /// Solana confirmation wait bound in seconds (default: `60`).
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// Solana node-side resubmission cap (default: `10`).
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_base_url() -> String {
    okx_dex_http::constants::DEFAULT_BASE_URL.to_owned()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_receipt_timeout_secs() -> u64 {
    120
}

const fn default_confirm_timeout_secs() -> u64 {
    60
}

const fn default_max_retries() -> usize {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            passphrase: String::new(),
            project_id: None,
            base_url: default_base_url(),
            http_proxy: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Returns the request credentials.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        let credentials = Credentials::new(&self.api_key, &self.secret_key, &self.passphrase);
        match resolved(self.project_id.as_deref()) {
            Some(project) => credentials.with_project_id(project),
            None => credentials,
        }
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the aggregator client.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the base URL or proxy is invalid.
    pub fn build_client(&self) -> Result<OkxApiClient, ApiClientError> {
        let client =
            OkxApiClient::try_new(&self.base_url, self.credentials())?.with_timeout(self.timeout());
        match resolved(self.http_proxy.as_deref()) {
            Some(proxy) => client.with_proxy(proxy),
            None => Ok(client),
        }
    }

    fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 3] = [
            ("OKX_API_KEY", &mut self.api_key),
            ("OKX_SECRET_KEY", &mut self.secret_key),
            ("OKX_API_PASSPHRASE", &mut self.passphrase),
        ];
        for (name, field) in overrides {
            if let Ok(value) = std::env::var(name) {
                *field = value;
            }
        }
        if let Ok(project) = std::env::var("OKX_PROJECT_ID") {
            self.project_id = Some(project);
        }
        if let Ok(proxy) = std::env::var("HTTP_PROXY") {
            self.http_proxy = Some(proxy);
        }
    }
}

impl ChainConfig {
    /// Creates settings with defaults and no signer.
    #[must_use]
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            private_key: None,
            receipt_timeout_secs: default_receipt_timeout_secs(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }

    /// Returns the default signer, if one is configured and resolved.
    ///
    /// A key still of the form `$VAR` refers to a missing environment
    /// variable and is treated as absent.
    #[must_use]
    pub fn signer(&self) -> Option<SignerKey> {
        resolved(self.private_key.as_deref()).map(SignerKey::from)
    }

    /// EVM receipt wait bound.
    #[must_use]
    pub const fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    /// Solana confirmation wait bound.
    #[must_use]
    pub const fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

impl DexConfig {
    /// Loads configuration from the path given by the `CONFIG` environment
    /// variable, falling back to `okx-dex.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the defaults. `$VAR` references are expanded
    /// before parsing and the `OKX_*` variables override `[api]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let content = if Path::new(path).exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        let mut config = Self::parse(&content)?;
        config.api.apply_env_overrides();
        Ok(config)
    }

    /// Parses TOML content after expanding environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the content is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_env_vars(content))?)
    }
}

/// Returns `value` unless it is empty or an unresolved `$VAR` reference.
fn resolved(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.starts_with('$'))
}

/// Expands `$VAR` and `${VAR}` references from the environment.
///
/// Unset variables, empty names and unterminated braces are kept verbatim.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, len) = match after.strip_prefix('{') {
            Some(inner) => inner.find('}').map_or(("", 0), |end| (&inner[..end], end + 2)),
            None => {
                let end = after
                    .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };

        let value = if name.is_empty() {
            None
        } else {
            std::env::var(name).ok()
        };
        match value {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[pos..=pos + len]),
        }
        rest = &after[len..];
    }

    out.push_str(rest);
    out
}
