//! Chain families and chain identifiers.
//!
//! - [`ChainType`] - The closed set of blockchain families a wallet can speak
//! - [`ChainRef`] - A chain identifier within a family: numeric for EVM, a
//!   cluster or genesis-hash reference for Solana and Polkadot

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A blockchain family with a distinct account, address and signing model.
///
/// Adding a family requires a new chain adapter and new wallet variants, so
/// this set is deliberately closed.
///
/// # Serialization
///
/// Serializes to the lowercase family name: `"evm"`, `"solana"`, `"polkadot"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    /// EVM-compatible chains reached through EIP-1193.
    Evm,
    /// Solana, reached through the wallet-standard injected API.
    Solana,
    /// Polkadot and its parachains, reached through the extension API.
    Polkadot,
}

impl ChainType {
    /// All chain families, in display order.
    pub const ALL: [Self; 3] = [Self::Evm, Self::Solana, Self::Polkadot];

    /// Returns the lowercase family name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
            Self::Polkadot => "polkadot",
        }
    }

    /// Returns a human-readable family name (e.g. `"Solana"`).
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Evm => "EVM",
            Self::Solana => "Solana",
            Self::Polkadot => "Polkadot",
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown chain family name.
#[derive(Debug, thiserror::Error)]
#[error("Unknown chain type {0}")]
pub struct ChainTypeParseError(String);

impl FromStr for ChainType {
    type Err = ChainTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "evm" | "eip155" => Ok(Self::Evm),
            "solana" | "svm" => Ok(Self::Solana),
            "polkadot" | "substrate" => Ok(Self::Polkadot),
            _ => Err(ChainTypeParseError(s.into())),
        }
    }
}

/// A chain identifier within a [`ChainType`].
///
/// EVM chains are numbered (EIP-155); Solana clusters and Polkadot networks
/// are named by a genesis-hash reference.
///
/// # Serialization
///
/// Untagged: EVM ids serialize as JSON numbers, named ids as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainRef {
    /// Numeric EIP-155 chain id.
    Evm(u64),
    /// Cluster or genesis-hash reference.
    Named(String),
}

impl ChainRef {
    /// Creates a named chain reference.
    pub fn named(reference: impl Into<String>) -> Self {
        Self::Named(reference.into())
    }

    /// Returns the numeric id for EVM references.
    #[must_use]
    pub const fn as_evm(&self) -> Option<u64> {
        match self {
            Self::Evm(id) => Some(*id),
            Self::Named(_) => None,
        }
    }
}

impl fmt::Display for ChainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm(id) => write!(f, "{id}"),
            Self::Named(reference) => f.write_str(reference),
        }
    }
}

impl From<u64> for ChainRef {
    fn from(value: u64) -> Self {
        Self::Evm(value)
    }
}

impl From<&str> for ChainRef {
    fn from(value: &str) -> Self {
        Self::Named(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_type_serde_lowercase() {
        let json = serde_json::to_string(&ChainType::Polkadot).unwrap();
        assert_eq!(json, "\"polkadot\"");
        let parsed: ChainType = serde_json::from_str("\"solana\"").unwrap();
        assert_eq!(parsed, ChainType::Solana);
    }

    #[test]
    fn test_chain_type_from_str_aliases() {
        assert_eq!("EVM".parse::<ChainType>().unwrap(), ChainType::Evm);
        assert_eq!("eip155".parse::<ChainType>().unwrap(), ChainType::Evm);
        assert!("bitcoin".parse::<ChainType>().is_err());
    }

    #[test]
    fn test_chain_ref_untagged_serde() {
        assert_eq!(serde_json::to_string(&ChainRef::Evm(1)).unwrap(), "1");
        let named: ChainRef = serde_json::from_str("\"devnet\"").unwrap();
        assert_eq!(named, ChainRef::named("devnet"));
        let numeric: ChainRef = serde_json::from_str("1287").unwrap();
        assert_eq!(numeric.as_evm(), Some(1287));
    }
}
