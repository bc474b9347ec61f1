//! Wallet layer configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! app_name = "Giving Portal"
//! default_evm_chain = 1287
//! solana_cluster = "devnet"
//! safe_origins = ["https://app.safe.global", "$SAFE_STAGING_ORIGIN"]
//!
//! [chains.1287]
//! chain_name = "Moonbase Alpha"
//! rpc_urls = ["${MOONBASE_RPC}"]
//! ```
//!
//! # Environment Variables
//!
//! - `WMUX_CONFIG` - Path to configuration file (default: `wmux.toml`)
//! - Any variable referenced by `$VAR` in the config file

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level wallet layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Dapp name presented to Polkadot extensions on `enable`.
    pub app_name: String,

    /// EVM chain to switch to on connect, if any.
    pub default_evm_chain: Option<u64>,

    /// EVM chain Coinbase Wallet connects to (default: Base, `8453`).
    pub coinbase_default_chain: u64,

    /// Solana cluster name (default: `mainnet-beta`).
    pub solana_cluster: String,

    /// Polkadot network name (default: `polkadot`).
    pub polkadot_network: String,

    /// Origins accepted as a Safe{Wallet} host frame.
    pub safe_origins: Vec<String>,

    /// BIP-32 path used to derive the Ledger EVM address.
    pub ledger_derivation_path: String,

    /// TTL for cached token prices, in seconds.
    pub price_cache_ttl_secs: u64,

    /// EVM chain parameter overrides keyed by decimal chain id.
    pub chains: HashMap<String, ChainOverride>,
}

/// Override or addition for one EVM chain's `wallet_addEthereumChain` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainOverride {
    /// Display name.
    pub chain_name: Option<String>,
    /// RPC endpoints.
    #[serde(default)]
    pub rpc_urls: Vec<String>,
    /// Block explorer URLs.
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
    /// Native currency symbol.
    pub currency_symbol: Option<String>,
    /// Native currency name.
    pub currency_name: Option<String>,
    /// Native currency decimals.
    pub currency_decimals: Option<u8>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            app_name: "wmux".to_owned(),
            default_evm_chain: None,
            coinbase_default_chain: 8453,
            solana_cluster: "mainnet-beta".to_owned(),
            polkadot_network: "polkadot".to_owned(),
            safe_origins: vec![
                "https://app.safe.global".to_owned(),
                "https://safe.global".to_owned(),
            ],
            ledger_derivation_path: "44'/60'/0'/0/0".to_owned(),
            price_cache_ttl_secs: 60,
            chains: HashMap::new(),
        }
    }
}

/// Error loading a [`WalletConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl WalletConfig {
    /// Loads configuration from the path given by the `WMUX_CONFIG` environment
    /// variable, falling back to `wmux.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WMUX_CONFIG").unwrap_or_else(|_| "wmux.toml".to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path. A missing file yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let content = if Path::new(path).exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?
        } else {
            tracing::debug!(path, "No wallet config file, using defaults");
            String::new()
        };
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string after `$VAR` expansion.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// TTL for cached price lookups.
    #[must_use]
    pub const fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.price_cache_ttl_secs)
    }

    /// Returns the parsed chain overrides, skipping keys that are not numbers.
    #[must_use]
    pub fn chain_overrides(&self) -> Vec<(u64, &ChainOverride)> {
        let mut overrides: Vec<_> = self
            .chains
            .iter()
            .filter_map(|(key, value)| match key.parse::<u64>() {
                Ok(id) => Some((id, value)),
                Err(_) => {
                    tracing::warn!(key = %key, "Ignoring chain override with non-numeric id");
                    None
                }
            })
            .collect();
        overrides.sort_by_key(|(id, _)| *id);
        overrides
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        match std::env::var(&var_name) {
            Ok(val) if !var_name.is_empty() => result.push_str(&val),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if braced && !var_name.is_empty() {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = WalletConfig::from_toml("").unwrap();
        assert_eq!(config, WalletConfig::default());
        assert_eq!(config.coinbase_default_chain, 8453);
        assert_eq!(config.ledger_derivation_path, "44'/60'/0'/0/0");
        assert_eq!(config.price_cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_parses_overrides() {
        let config = WalletConfig::from_toml(
            r#"
            app_name = "Giving Portal"
            default_evm_chain = 1287

            [chains.1287]
            rpc_urls = ["https://moonbase.example"]

            [chains.bogus]
            rpc_urls = []
            "#,
        )
        .unwrap();
        assert_eq!(config.app_name, "Giving Portal");
        assert_eq!(config.default_evm_chain, Some(1287));
        let overrides = config.chain_overrides();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].0, 1287);
        assert_eq!(overrides[0].1.rpc_urls, vec!["https://moonbase.example"]);
    }

    #[test]
    fn test_expand_env_vars_leaves_unknown() {
        let out = expand_env_vars("a=${WMUX_SURELY_UNSET_VAR} b=$ c=$WMUX_SURELY_UNSET_VAR");
        assert_eq!(out, "a=${WMUX_SURELY_UNSET_VAR} b=$ c=$WMUX_SURELY_UNSET_VAR");
    }

    #[test]
    fn test_expand_env_vars_resolves_path() {
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env_vars("${PATH}"), path);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = WalletConfig::load_from("/nonexistent/wmux.toml").unwrap();
        assert_eq!(config.solana_cluster, "mainnet-beta");
    }
}
