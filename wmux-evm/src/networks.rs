//! Known EVM chains and their `wallet_addEthereumChain` parameters.
//!
//! Used when a wallet answers a chain switch with "chain not added" (4902):
//! the adapter adds the chain from this table, then retries the switch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wmux::config::ChainOverride;

/// Ethereum Mainnet chain ID.
pub const ETHEREUM_MAINNET: u64 = 1;

/// Ethereum Sepolia (testnet) chain ID.
pub const ETHEREUM_SEPOLIA: u64 = 11_155_111;

/// Optimism Mainnet chain ID.
pub const OPTIMISM_MAINNET: u64 = 10;

/// BNB Smart Chain chain ID.
pub const BSC_MAINNET: u64 = 56;

/// Polygon Mainnet chain ID.
pub const POLYGON_MAINNET: u64 = 137;

/// Polygon Amoy (testnet) chain ID.
pub const POLYGON_AMOY: u64 = 80_002;

/// Base Mainnet chain ID.
pub const BASE_MAINNET: u64 = 8453;

/// Base Sepolia (testnet) chain ID.
pub const BASE_SEPOLIA: u64 = 84_532;

/// Arbitrum One chain ID.
pub const ARBITRUM_ONE: u64 = 42_161;

/// Avalanche C-Chain chain ID.
pub const AVALANCHE_MAINNET: u64 = 43_114;

/// Celo Mainnet chain ID.
pub const CELO_MAINNET: u64 = 42_220;

/// Moonbeam chain ID.
pub const MOONBEAM: u64 = 1284;

/// Moonriver chain ID.
pub const MOONRIVER: u64 = 1285;

/// Moonbase Alpha (Moonbeam testnet) chain ID.
pub const MOONBASE_ALPHA: u64 = 1287;

/// Native currency of an EVM chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name (e.g. `"Ether"`).
    pub name: String,
    /// Ticker symbol (e.g. `"ETH"`).
    pub symbol: String,
    /// Decimals of the base unit.
    pub decimals: u8,
}

/// Body of a `wallet_addEthereumChain` request (EIP-3085).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEthereumChainParameter {
    /// 0x-hex chain id.
    pub chain_id: String,
    /// Display name.
    pub chain_name: String,
    /// Native currency.
    pub native_currency: NativeCurrency,
    /// RPC endpoints.
    pub rpc_urls: Vec<String>,
    /// Block explorer URLs.
    pub block_explorer_urls: Vec<String>,
}

struct KnownChain {
    id: u64,
    name: &'static str,
    currency: (&'static str, &'static str, u8),
    rpc_url: &'static str,
    explorer_url: &'static str,
}

static KNOWN_CHAINS: &[KnownChain] = &[
    KnownChain {
        id: ETHEREUM_MAINNET,
        name: "Ethereum Mainnet",
        currency: ("Ether", "ETH", 18),
        rpc_url: "https://eth.llamarpc.com",
        explorer_url: "https://etherscan.io",
    },
    KnownChain {
        id: ETHEREUM_SEPOLIA,
        name: "Sepolia",
        currency: ("Sepolia Ether", "ETH", 18),
        rpc_url: "https://rpc.sepolia.org",
        explorer_url: "https://sepolia.etherscan.io",
    },
    KnownChain {
        id: OPTIMISM_MAINNET,
        name: "OP Mainnet",
        currency: ("Ether", "ETH", 18),
        rpc_url: "https://mainnet.optimism.io",
        explorer_url: "https://optimistic.etherscan.io",
    },
    KnownChain {
        id: BSC_MAINNET,
        name: "BNB Smart Chain",
        currency: ("BNB", "BNB", 18),
        rpc_url: "https://bsc-dataseed.binance.org",
        explorer_url: "https://bscscan.com",
    },
    KnownChain {
        id: POLYGON_MAINNET,
        name: "Polygon",
        currency: ("POL", "POL", 18),
        rpc_url: "https://polygon-rpc.com",
        explorer_url: "https://polygonscan.com",
    },
    KnownChain {
        id: POLYGON_AMOY,
        name: "Polygon Amoy",
        currency: ("POL", "POL", 18),
        rpc_url: "https://rpc-amoy.polygon.technology",
        explorer_url: "https://amoy.polygonscan.com",
    },
    KnownChain {
        id: BASE_MAINNET,
        name: "Base",
        currency: ("Ether", "ETH", 18),
        rpc_url: "https://mainnet.base.org",
        explorer_url: "https://basescan.org",
    },
    KnownChain {
        id: BASE_SEPOLIA,
        name: "Base Sepolia",
        currency: ("Sepolia Ether", "ETH", 18),
        rpc_url: "https://sepolia.base.org",
        explorer_url: "https://sepolia.basescan.org",
    },
    KnownChain {
        id: ARBITRUM_ONE,
        name: "Arbitrum One",
        currency: ("Ether", "ETH", 18),
        rpc_url: "https://arb1.arbitrum.io/rpc",
        explorer_url: "https://arbiscan.io",
    },
    KnownChain {
        id: AVALANCHE_MAINNET,
        name: "Avalanche C-Chain",
        currency: ("Avalanche", "AVAX", 18),
        rpc_url: "https://api.avax.network/ext/bc/C/rpc",
        explorer_url: "https://snowtrace.io",
    },
    KnownChain {
        id: CELO_MAINNET,
        name: "Celo",
        currency: ("Celo", "CELO", 18),
        rpc_url: "https://forno.celo.org",
        explorer_url: "https://celoscan.io",
    },
    KnownChain {
        id: MOONBEAM,
        name: "Moonbeam",
        currency: ("Glimmer", "GLMR", 18),
        rpc_url: "https://rpc.api.moonbeam.network",
        explorer_url: "https://moonscan.io",
    },
    KnownChain {
        id: MOONRIVER,
        name: "Moonriver",
        currency: ("Moonriver", "MOVR", 18),
        rpc_url: "https://rpc.api.moonriver.moonbeam.network",
        explorer_url: "https://moonriver.moonscan.io",
    },
    KnownChain {
        id: MOONBASE_ALPHA,
        name: "Moonbase Alpha",
        currency: ("DEV", "DEV", 18),
        rpc_url: "https://rpc.api.moonbase.moonbeam.network",
        explorer_url: "https://moonbase.moonscan.io",
    },
];

impl KnownChain {
    fn to_parameter(&self) -> AddEthereumChainParameter {
        let (name, symbol, decimals) = self.currency;
        AddEthereumChainParameter {
            chain_id: format!("{:#x}", self.id),
            chain_name: self.name.to_owned(),
            native_currency: NativeCurrency {
                name: name.to_owned(),
                symbol: symbol.to_owned(),
                decimals,
            },
            rpc_urls: vec![self.rpc_url.to_owned()],
            block_explorer_urls: vec![self.explorer_url.to_owned()],
        }
    }
}

/// Returns the numeric ids of all built-in chains.
#[must_use]
pub fn known_chain_ids() -> Vec<u64> {
    KNOWN_CHAINS.iter().map(|c| c.id).collect()
}

/// Lookup table of `wallet_addEthereumChain` parameters by chain id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParamsTable {
    entries: BTreeMap<u64, AddEthereumChainParameter>,
}

impl ChainParamsTable {
    /// Creates a table with the built-in chains.
    #[must_use]
    pub fn known() -> Self {
        Self {
            entries: KNOWN_CHAINS
                .iter()
                .map(|c| (c.id, c.to_parameter()))
                .collect(),
        }
    }

    /// Creates an empty table.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Applies configuration overrides on top of the current entries.
    ///
    /// An override for an unknown chain is added only when it names the
    /// chain and at least one RPC URL; otherwise it is skipped.
    #[must_use]
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (u64, &'a ChainOverride)>,
    ) -> Self {
        for (id, ov) in overrides {
            if let Some(entry) = self.entries.get_mut(&id) {
                if let Some(name) = &ov.chain_name {
                    entry.chain_name.clone_from(name);
                }
                if !ov.rpc_urls.is_empty() {
                    entry.rpc_urls.clone_from(&ov.rpc_urls);
                }
                if !ov.block_explorer_urls.is_empty() {
                    entry
                        .block_explorer_urls
                        .clone_from(&ov.block_explorer_urls);
                }
                if let Some(symbol) = &ov.currency_symbol {
                    entry.native_currency.symbol.clone_from(symbol);
                }
                if let Some(name) = &ov.currency_name {
                    entry.native_currency.name.clone_from(name);
                }
                if let Some(decimals) = ov.currency_decimals {
                    entry.native_currency.decimals = decimals;
                }
                continue;
            }
            let Some(chain_name) = ov.chain_name.clone() else {
                tracing::warn!(chain_id = id, "Skipping chain override without a chain_name");
                continue;
            };
            if ov.rpc_urls.is_empty() {
                tracing::warn!(chain_id = id, "Skipping chain override without rpc_urls");
                continue;
            }
            let symbol = ov.currency_symbol.clone().unwrap_or_else(|| "ETH".to_owned());
            self.entries.insert(
                id,
                AddEthereumChainParameter {
                    chain_id: format!("{id:#x}"),
                    chain_name,
                    native_currency: NativeCurrency {
                        name: ov.currency_name.clone().unwrap_or_else(|| symbol.clone()),
                        symbol,
                        decimals: ov.currency_decimals.unwrap_or(18),
                    },
                    rpc_urls: ov.rpc_urls.clone(),
                    block_explorer_urls: ov.block_explorer_urls.clone(),
                },
            );
        }
        self
    }

    /// Returns the parameters for `chain_id`.
    #[must_use]
    pub fn get(&self, chain_id: u64) -> Option<&AddEthereumChainParameter> {
        self.entries.get(&chain_id)
    }

    /// Returns the display name for `chain_id`, or `"Chain {id}"` if unknown.
    #[must_use]
    pub fn chain_name(&self, chain_id: u64) -> String {
        self.get(chain_id)
            .map_or_else(|| format!("Chain {chain_id}"), |p| p.chain_name.clone())
    }

    /// Returns `true` if the table has parameters for `chain_id`.
    #[must_use]
    pub fn contains(&self, chain_id: u64) -> bool {
        self.entries.contains_key(&chain_id)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ChainParamsTable {
    fn default() -> Self {
        Self::known()
    }
}
