//! The injected Solana wallet port (`window.phantom.solana`,
//! `window.coinbaseSolana`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use wmux::ProviderRpcError;

/// Vendor flags set on an injected Solana wallet object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolanaWalletFlags {
    /// `isPhantom`.
    pub is_phantom: bool,
    /// `isCoinbaseWallet`.
    pub is_coinbase_wallet: bool,
}

/// A wallet-standard Solana wallet.
#[async_trait]
pub trait SolanaWallet: Send + Sync + fmt::Debug {
    /// Requests access and returns the base58 public key.
    ///
    /// # Errors
    ///
    /// Returns the wallet's rejection unchanged.
    async fn connect(&self) -> Result<String, ProviderRpcError>;

    /// Revokes the site's session with the wallet.
    ///
    /// # Errors
    ///
    /// Returns the wallet's error unchanged.
    async fn disconnect(&self) -> Result<(), ProviderRpcError>;

    /// Returns the public key while the wallet considers the site connected.
    fn public_key(&self) -> Option<String>;

    /// Signs and broadcasts a serialized transaction, returning the base58
    /// transaction signature.
    ///
    /// # Errors
    ///
    /// Returns the wallet's error unchanged.
    async fn sign_and_send_transaction(&self, transaction: &[u8])
    -> Result<String, ProviderRpcError>;

    /// Signs arbitrary bytes, returning the raw ed25519 signature.
    ///
    /// # Errors
    ///
    /// Returns the wallet's error unchanged.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ProviderRpcError>;

    /// Vendor flags on the object.
    fn flags(&self) -> SolanaWalletFlags {
        SolanaWalletFlags::default()
    }
}
