//! MetaMask.

use std::sync::Arc;
use wmux::{ChainType, WalletCategory, WalletMeta};
use wmux_evm::{ChainParamsTable, Eip1193Provider};

use crate::detect::find_ethereum;
use crate::env::{BrowserContext, BrowserWindow};
use crate::evm_wallet::EvmWallet;

/// Display name.
pub const NAME: &str = "MetaMask";
/// Icon asset.
pub const ICON: &str = "/wallets/metamask.svg";

/// Static metadata.
#[must_use]
pub fn meta() -> WalletMeta {
    WalletMeta::new(NAME, ICON, WalletCategory::Browser, vec![ChainType::Evm])
}

/// Finds an object flagged `isMetaMask` that no other wallet also claims.
///
/// Several extensions set `isMetaMask` for compatibility, so any object
/// carrying another wallet's flag is skipped.
#[must_use]
pub fn detect(window: &BrowserWindow) -> Option<Arc<dyn Eip1193Provider>> {
    find_ethereum(window, |flags| {
        flags.is_meta_mask && !flags.is_impersonating_metamask()
    })
}

/// Builds the provider.
#[must_use]
pub fn wallet(
    ctx: Arc<BrowserContext>,
    networks: Arc<ChainParamsTable>,
    default_chain: Option<u64>,
) -> EvmWallet {
    EvmWallet::new(meta(), ctx, Arc::new(detect), networks).with_default_chain(default_chain)
}
