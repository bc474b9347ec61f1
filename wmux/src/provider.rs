//! The unified wallet-provider capability and the secondary chain adapter seam.
//!
//! - [`UnifiedWalletProvider`] - What every wallet (MetaMask, Phantom, Safe, ...)
//!   exposes to the UI layer
//! - [`SecondaryChainAdapter`] - The narrow surface a non-EVM chain adapter
//!   implements so multi-chain wallets can treat "the other side" uniformly

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::UnifiedAccount;
use crate::chain::{ChainRef, ChainType};
use crate::error::WalletError;
use crate::events::WalletEventHandlers;
use crate::transaction::{SignableMessage, UnifiedTransactionRequest};

/// UI grouping for wallets. Descriptive only; no behaviour depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletCategory {
    /// Browser-extension wallet for a single chain family.
    Browser,
    /// Browser-extension wallet spanning several chain families.
    Multichain,
    /// Hardware wallet.
    Hardware,
    /// Smart-contract or custodial wallet for organisations.
    Institutional,
}

/// Static description of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMeta {
    /// Display name, also used as the `source` of produced accounts.
    pub name: String,
    /// Icon URL or data URI.
    pub icon: String,
    /// UI grouping.
    pub category: WalletCategory,
    /// Chain families this wallet can connect to, primary first.
    pub supported_chain_types: Vec<ChainType>,
}

impl WalletMeta {
    /// Creates wallet metadata.
    pub fn new(
        name: impl Into<String>,
        icon: impl Into<String>,
        category: WalletCategory,
        supported_chain_types: Vec<ChainType>,
    ) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
            category,
            supported_chain_types,
        }
    }

    /// Returns `true` if the wallet supports `chain_type`.
    #[must_use]
    pub fn supports(&self, chain_type: ChainType) -> bool {
        self.supported_chain_types.contains(&chain_type)
    }
}

/// The capability set every concrete wallet implements.
///
/// A provider is constructed once per registry build and holds no connection
/// until [`connect`](Self::connect) is called. Calls suspend wherever control
/// crosses into the wallet (permission and signature prompts) and may wait on
/// the user indefinitely; timeouts and retries are the caller's concern.
#[async_trait]
pub trait UnifiedWalletProvider: Send + Sync + fmt::Debug {
    /// Static metadata.
    fn meta(&self) -> &WalletMeta;

    /// Display name.
    fn name(&self) -> &str {
        &self.meta().name
    }

    /// Icon URL or data URI.
    fn icon(&self) -> &str {
        &self.meta().icon
    }

    /// UI grouping.
    fn category(&self) -> WalletCategory {
        self.meta().category
    }

    /// Chain families this wallet can connect to.
    fn supported_chain_types(&self) -> &[ChainType] {
        &self.meta().supported_chain_types
    }

    /// Chain families whose injected object is currently present.
    fn detected_chains(&self) -> Vec<ChainType>;

    /// Pure, repeatable presence check. Never fails; returns `false` when
    /// there is no browser window.
    fn is_installed(&self) -> bool;

    /// Connects to `chain_type`, or to every supported family when `None`.
    ///
    /// Returns a non-empty account list or an error; never an empty list.
    /// Connecting again replaces the held adapters.
    ///
    /// # Errors
    ///
    /// [`WalletError::NotInstalled`], [`WalletError::NoAccounts`],
    /// [`WalletError::NoAccountsConnected`], [`WalletError::UserRejected`] or
    /// any other adapter failure.
    async fn connect(
        &self,
        chain_type: Option<ChainType>,
    ) -> Result<Vec<UnifiedAccount>, WalletError>;

    /// Drops the held adapters and their event listeners. Safe to call when
    /// never connected.
    ///
    /// # Errors
    ///
    /// Returns an error only if the wallet rejects the disconnect request.
    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Returns the connected accounts for `chain_type`, or for all families.
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    async fn get_accounts(
        &self,
        chain_type: Option<ChainType>,
    ) -> Result<Vec<UnifiedAccount>, WalletError>;

    /// Switches the active chain (EVM chain id, Solana cluster).
    ///
    /// # Errors
    ///
    /// [`WalletError::NotConnected`], [`WalletError::UserRejected`],
    /// [`WalletError::Unsupported`] or the wallet's own failure.
    async fn switch_chain(&self, chain_id: ChainRef, chain_type: ChainType)
    -> Result<(), WalletError>;

    /// Signs and submits a transaction, returning its identifier.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unsupported`] when the wallet does not serve the
    /// request's chain family, otherwise any adapter failure.
    async fn sign_transaction(&self, tx: &UnifiedTransactionRequest)
    -> Result<String, WalletError>;

    /// Signs a message on `chain_type`, returning the encoded signature.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unsupported`] for a chain family the wallet does not
    /// serve, otherwise adapter failures.
    async fn sign_message(
        &self,
        message: &SignableMessage,
        chain_type: ChainType,
    ) -> Result<String, WalletError>;

    /// Installs account/chain/disconnect listeners for the connected session.
    /// The provider removes them on `disconnect`.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unsupported`] for wallets without an event source.
    fn watch(&self, handlers: WalletEventHandlers) -> Result<(), WalletError> {
        drop(handlers);
        Err(WalletError::unsupported(
            self.name(),
            "watch",
            "wallet does not emit events",
        ))
    }
}

/// Operations a non-EVM chain adapter offers to a multi-chain wallet.
///
/// A strict subset of what the EVM adapter offers, so a new chain family
/// only needs to implement this surface. Chain switching is optional:
/// Solana models it as cluster selection, Polkadot adapters may not
/// support it at all.
#[async_trait]
pub trait SecondaryChainAdapter: Send + Sync + fmt::Debug {
    /// Chain family this adapter handles.
    fn chain_type(&self) -> ChainType;

    /// Releases the wallet connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet rejects the request.
    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Returns the connected accounts.
    ///
    /// # Errors
    ///
    /// Propagates wallet failures.
    async fn get_accounts(&self) -> Result<Vec<UnifiedAccount>, WalletError>;

    /// Signs and submits a transaction.
    ///
    /// # Errors
    ///
    /// [`WalletError::TypeMismatch`] when `tx` targets another family.
    async fn sign_transaction(&self, tx: &UnifiedTransactionRequest)
    -> Result<String, WalletError>;

    /// Signs a message.
    ///
    /// # Errors
    ///
    /// Propagates wallet failures.
    async fn sign_message(&self, message: &SignableMessage) -> Result<String, WalletError>;

    /// Whether [`switch_cluster`](Self::switch_cluster) is available.
    fn supports_cluster_switch(&self) -> bool {
        false
    }

    /// Selects a cluster by name.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unsupported`] unless overridden.
    async fn switch_cluster(&self, cluster: &str) -> Result<(), WalletError> {
        Err(WalletError::unsupported(
            self.chain_type().display_name(),
            "switch_cluster",
            format!("cannot select cluster {cluster}"),
        ))
    }

    /// Whether [`switch_chain`](Self::switch_chain) is available.
    fn supports_chain_switch(&self) -> bool {
        false
    }

    /// Switches to another chain of the same family.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unsupported`] unless overridden.
    async fn switch_chain(&self, chain_id: &ChainRef) -> Result<(), WalletError> {
        Err(WalletError::unsupported(
            self.chain_type().display_name(),
            "switch_chain",
            format!("cannot switch to {chain_id}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_supports() {
        let meta = WalletMeta::new(
            "Phantom",
            "",
            WalletCategory::Multichain,
            vec![ChainType::Evm, ChainType::Solana],
        );
        assert!(meta.supports(ChainType::Solana));
        assert!(!meta.supports(ChainType::Polkadot));
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&WalletCategory::Institutional).unwrap();
        assert_eq!(json, "\"institutional\"");
    }
}
