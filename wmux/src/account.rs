//! Chain-agnostic account model.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::chain::{ChainRef, ChainType};

/// An account exposed by a wallet, on any chain family.
///
/// The `id` is derived from `(chain_type, chain_id, address)` and is used to
/// detect and merge duplicate discovery results; see [`UnifiedAccount::derive_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedAccount {
    /// Opaque identity, unique per chain family, chain and address.
    pub id: String,
    /// Address in the chain's native encoding.
    pub address: String,
    /// Chain family.
    pub chain_type: ChainType,
    /// Chain the account was discovered on.
    pub chain_id: ChainRef,
    /// Display name of the chain.
    pub chain_name: String,
    /// Name of the wallet that produced the account.
    pub source: String,
    /// Display label (e.g. `"Primary Account"`).
    pub name: String,
}

impl UnifiedAccount {
    /// Creates an account, deriving its id from the identity triple.
    pub fn new(
        address: impl Into<String>,
        chain_type: ChainType,
        chain_id: ChainRef,
        chain_name: impl Into<String>,
        source: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let address = address.into();
        Self {
            id: Self::derive_id(chain_type, &chain_id, &address),
            address,
            chain_type,
            chain_id,
            chain_name: chain_name.into(),
            source: source.into(),
            name: name.into(),
        }
    }

    /// Derives the account id from `(chain_type, chain_id, address)`.
    ///
    /// Pure: the same inputs always produce the same id. EVM addresses are
    /// case-insensitive (EIP-55 checksumming only changes case), so they are
    /// lower-cased first; Solana and Polkadot addresses are case-sensitive.
    #[must_use]
    pub fn derive_id(chain_type: ChainType, chain_id: &ChainRef, address: &str) -> String {
        let address = match chain_type {
            ChainType::Evm => address.to_ascii_lowercase(),
            ChainType::Solana | ChainType::Polkadot => address.to_owned(),
        };
        format!("{chain_type}:{chain_id}:{address}")
    }
}

/// Returns the display label for the account at `index` in a wallet's list.
#[must_use]
pub fn account_label(index: usize) -> String {
    if index == 0 {
        "Primary Account".to_owned()
    } else {
        format!("Account {}", index + 1)
    }
}

/// Removes accounts with duplicate ids, keeping the first occurrence.
#[must_use]
pub fn dedup_accounts(accounts: Vec<UnifiedAccount>) -> Vec<UnifiedAccount> {
    let mut seen = HashSet::with_capacity(accounts.len());
    accounts
        .into_iter()
        .filter(|account| seen.insert(account.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evm(address: &str) -> UnifiedAccount {
        UnifiedAccount::new(
            address,
            ChainType::Evm,
            ChainRef::Evm(1),
            "Ethereum",
            "MetaMask",
            "Primary Account",
        )
    }

    #[test]
    fn test_derive_id_is_pure() {
        let a = UnifiedAccount::derive_id(ChainType::Evm, &ChainRef::Evm(1), "0xAbC");
        let b = UnifiedAccount::derive_id(ChainType::Evm, &ChainRef::Evm(1), "0xAbC");
        assert_eq!(a, b);
        assert_eq!(a, "evm:1:0xabc");
    }

    #[test]
    fn test_derive_id_distinguishes_chains() {
        let mainnet = UnifiedAccount::derive_id(ChainType::Evm, &ChainRef::Evm(1), "0xabc");
        let base = UnifiedAccount::derive_id(ChainType::Evm, &ChainRef::Evm(8453), "0xabc");
        assert_ne!(mainnet, base);
    }

    #[test]
    fn test_solana_address_case_is_significant() {
        let cluster = ChainRef::named("devnet");
        let lower = UnifiedAccount::derive_id(ChainType::Solana, &cluster, "abc");
        let upper = UnifiedAccount::derive_id(ChainType::Solana, &cluster, "ABC");
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_dedup_merges_checksum_variants() {
        let accounts = vec![evm("0xABC"), evm("0xabc"), evm("0xdef")];
        let deduped = dedup_accounts(accounts);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].address, "0xABC");
    }

    #[test]
    fn test_account_labels() {
        assert_eq!(account_label(0), "Primary Account");
        assert_eq!(account_label(1), "Account 2");
        assert_eq!(account_label(4), "Account 5");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(evm("0xabc")).unwrap();
        assert_eq!(json["chainType"], "evm");
        assert_eq!(json["chainId"], 1);
        assert_eq!(json["chainName"], "Ethereum");
    }
}
