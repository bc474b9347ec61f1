//! Well-known Solana clusters.
//!
//! A cluster is identified by the first 32 characters of its genesis block
//! hash, the same reference CAIP-2 uses:
//! - Mainnet Beta: `5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp`
//! - Devnet: `EtWTRABZaYq6iMfeYKouRu166VU2xqa1`
//! - Testnet: `4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use wmux::ChainRef;

/// A Solana cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolanaCluster {
    /// `mainnet-beta`.
    #[default]
    MainnetBeta,
    /// `devnet`.
    Devnet,
    /// `testnet`.
    Testnet,
}

impl SolanaCluster {
    /// All clusters.
    pub const ALL: [Self; 3] = [Self::MainnetBeta, Self::Devnet, Self::Testnet];

    /// Returns the cluster name used by wallets and RPC endpoints.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "mainnet-beta",
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
        }
    }

    /// Returns the genesis-hash reference.
    #[must_use]
    pub const fn genesis_ref(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
            Self::Devnet => "EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
            Self::Testnet => "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z",
        }
    }

    /// Returns the display name shown next to accounts.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "Solana Mainnet",
            Self::Devnet => "Solana Devnet",
            Self::Testnet => "Solana Testnet",
        }
    }

    /// Returns the chain reference accounts on this cluster are tagged with.
    #[must_use]
    pub fn chain_ref(&self) -> ChainRef {
        ChainRef::named(self.genesis_ref())
    }

    /// Looks a cluster up by its genesis-hash reference.
    #[must_use]
    pub fn from_genesis_ref(reference: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.genesis_ref() == reference)
    }
}

impl fmt::Display for SolanaCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a cluster name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown Solana cluster: {0}")]
pub struct UnknownCluster(pub String);

impl FromStr for SolanaCluster {
    type Err = UnknownCluster;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet-beta" | "mainnet" => Ok(Self::MainnetBeta),
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            other => Self::from_genesis_ref(s.trim()).ok_or_else(|| UnknownCluster(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_refs() {
        assert_eq!("mainnet".parse::<SolanaCluster>().unwrap(), SolanaCluster::MainnetBeta);
        assert_eq!("Devnet".parse::<SolanaCluster>().unwrap(), SolanaCluster::Devnet);
        assert_eq!(
            "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z".parse::<SolanaCluster>().unwrap(),
            SolanaCluster::Testnet
        );
        let err = "localnet".parse::<SolanaCluster>().unwrap_err();
        assert_eq!(err, UnknownCluster("localnet".to_owned()));
        assert_eq!(err.to_string(), "unknown Solana cluster: localnet");
    }

    #[test]
    fn test_chain_ref_uses_genesis_hash() {
        assert_eq!(
            SolanaCluster::MainnetBeta.chain_ref(),
            ChainRef::named("5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp")
        );
    }
}
