//! Well-known Substrate relay chains and SS58 address checks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use wmux::ChainRef;

/// A Polkadot-ecosystem network the adapter can report accounts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolkadotNetwork {
    /// Polkadot relay chain.
    #[default]
    Polkadot,
    /// Kusama relay chain.
    Kusama,
    /// Westend testnet.
    Westend,
}

impl PolkadotNetwork {
    /// All networks.
    pub const ALL: [Self; 3] = [Self::Polkadot, Self::Kusama, Self::Westend];

    /// Returns the lower-case network name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Polkadot => "polkadot",
            Self::Kusama => "kusama",
            Self::Westend => "westend",
        }
    }

    /// Returns the 0x-hex genesis hash.
    #[must_use]
    pub const fn genesis_hash(&self) -> &'static str {
        match self {
            Self::Polkadot => "0x91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3",
            Self::Kusama => "0xb0a8d493285c2df73290dfb7e61f870f17b41801197a149ca93654499ea3dafe",
            Self::Westend => "0xe143f23803ac50e8f6f8e62695d1ce9e4e1d68aa36c1cd2cfd15340213f3423e",
        }
    }

    /// Returns the display name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Polkadot => "Polkadot",
            Self::Kusama => "Kusama",
            Self::Westend => "Westend",
        }
    }

    /// Returns the network's SS58 address prefix.
    #[must_use]
    pub const fn ss58_prefix(&self) -> u16 {
        match self {
            Self::Polkadot => 0,
            Self::Kusama => 2,
            Self::Westend => 42,
        }
    }

    /// Returns the chain reference accounts on this network are tagged with.
    #[must_use]
    pub fn chain_ref(&self) -> ChainRef {
        ChainRef::named(self.genesis_hash())
    }

    /// Returns `true` if an account restricted to `genesis_hash` may be used
    /// here. Accounts without a restriction are usable on every network.
    #[must_use]
    pub fn accepts(&self, genesis_hash: Option<&str>) -> bool {
        genesis_hash
            .filter(|hash| !hash.is_empty())
            .is_none_or(|hash| hash.eq_ignore_ascii_case(self.genesis_hash()))
    }
}

impl fmt::Display for PolkadotNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a network name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown Polkadot network: {0}")]
pub struct UnknownNetwork(pub String);

impl FromStr for PolkadotNetwork {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|n| n.as_str() == name || n.genesis_hash() == name)
            .ok_or(UnknownNetwork(name))
    }
}

/// Decodes the SS58 prefix of a 32-byte account address.
///
/// Checks the base58 layout (one- or two-byte prefix, 32-byte key, 2-byte
/// checksum). The blake2b checksum itself is left to the extension, which
/// produced the address.
#[must_use]
pub fn ss58_prefix(address: &str) -> Option<u16> {
    let bytes = bs58::decode(address.trim()).into_vec().ok()?;
    match (bytes.len(), bytes.first().copied()?) {
        (35, first) if first < 64 => Some(u16::from(first)),
        (36, first) if (64..128).contains(&first) => {
            let second = *bytes.get(1)?;
            let lower = (u16::from(first) << 2) | (u16::from(second) >> 6);
            let upper = u16::from(second & 0b0011_1111);
            Some((lower & 0b0000_0000_1111_1111) | (upper << 8))
        }
        _ => None,
    }
}

/// Returns `true` if `address` has the layout of an SS58 account address.
#[must_use]
pub fn is_ss58_address(address: &str) -> bool {
    ss58_prefix(address).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ss58_prefixes() {
        assert_eq!(ss58_prefix("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"), Some(42));
        assert_eq!(ss58_prefix("15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5"), Some(0));
        assert!(!is_ss58_address("0xabc0000000000000000000000000000000000001"));
        assert!(!is_ss58_address("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"));
    }

    #[test]
    fn test_genesis_filter() {
        let polkadot = PolkadotNetwork::Polkadot;
        assert!(polkadot.accepts(None));
        assert!(polkadot.accepts(Some("")));
        assert!(polkadot.accepts(Some(PolkadotNetwork::Polkadot.genesis_hash())));
        assert!(!polkadot.accepts(Some(PolkadotNetwork::Kusama.genesis_hash())));
    }

    #[test]
    fn test_parse_network() {
        assert_eq!("Kusama".parse::<PolkadotNetwork>().unwrap(), PolkadotNetwork::Kusama);
        let err = "rococo".parse::<PolkadotNetwork>().unwrap_err();
        assert_eq!(err.to_string(), "unknown Polkadot network: rococo");
    }
}
