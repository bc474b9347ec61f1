//! Talisman (EVM + Polkadot).

use std::sync::Arc;
use wmux::{ChainType, WalletCategory, WalletMeta};
use wmux_dot::{PolkadotExtension, PolkadotNetwork};
use wmux_evm::{ChainParamsTable, Eip1193Provider};

use crate::detect::injected_web3;
use crate::env::{BrowserContext, BrowserWindow};
use crate::multichain::{MultiChainWallet, SecondaryConnector};

/// Display name.
pub const NAME: &str = "Talisman";
/// Icon asset.
pub const ICON: &str = "/wallets/talisman.svg";
/// Key under `window.injectedWeb3`.
pub const EXTENSION_NAME: &str = "talisman";

/// Static metadata.
#[must_use]
pub fn meta() -> WalletMeta {
    WalletMeta::new(
        NAME,
        ICON,
        WalletCategory::Multichain,
        vec![ChainType::Evm, ChainType::Polkadot],
    )
}

/// `window.talismanEth`.
#[must_use]
pub fn detect_evm(window: &BrowserWindow) -> Option<Arc<dyn Eip1193Provider>> {
    window.talisman_eth.clone()
}

/// `window.injectedWeb3["talisman"]`.
#[must_use]
pub fn detect_polkadot(window: &BrowserWindow) -> Option<Arc<dyn PolkadotExtension>> {
    injected_web3(window, EXTENSION_NAME)
}

/// Builds the provider.
#[must_use]
pub fn wallet(
    ctx: Arc<BrowserContext>,
    networks: Arc<ChainParamsTable>,
    default_chain: Option<u64>,
    app_name: &str,
    network: PolkadotNetwork,
) -> MultiChainWallet {
    MultiChainWallet::new(
        meta(),
        ctx,
        Arc::new(detect_evm),
        SecondaryConnector::Polkadot {
            detector: Arc::new(detect_polkadot),
            app_name: app_name.to_owned(),
            network,
        },
        networks,
    )
    .with_default_chain(default_chain)
}
