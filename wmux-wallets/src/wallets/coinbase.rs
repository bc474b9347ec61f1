//! Coinbase Wallet (EVM + Solana). Connects to Base by default.

use std::sync::Arc;
use wmux::{ChainType, WalletCategory, WalletMeta};
use wmux_evm::{ChainParamsTable, Eip1193Provider};
use wmux_svm::{SolanaCluster, SolanaWallet};

use crate::detect::find_ethereum;
use crate::env::{BrowserContext, BrowserWindow};
use crate::multichain::{MultiChainWallet, SecondaryConnector};

/// Display name.
pub const NAME: &str = "Coinbase Wallet";
/// Icon asset.
pub const ICON: &str = "/wallets/coinbase.svg";
/// EVM chain connected to when nothing else is configured (Base).
pub const DEFAULT_CHAIN: u64 = 8453;

/// Static metadata.
#[must_use]
pub fn meta() -> WalletMeta {
    WalletMeta::new(
        NAME,
        ICON,
        WalletCategory::Multichain,
        vec![ChainType::Evm, ChainType::Solana],
    )
}

/// `window.coinbaseWalletExtension`, else an object flagged `isCoinbaseWallet`.
#[must_use]
pub fn detect_evm(window: &BrowserWindow) -> Option<Arc<dyn Eip1193Provider>> {
    window
        .coinbase_wallet_extension
        .clone()
        .or_else(|| find_ethereum(window, |flags| flags.is_coinbase_wallet))
}

/// `window.coinbaseSolana`.
#[must_use]
pub fn detect_solana(window: &BrowserWindow) -> Option<Arc<dyn SolanaWallet>> {
    window.coinbase_solana.clone()
}

/// Builds the provider, switching the EVM side to `default_chain` on connect.
#[must_use]
pub fn wallet(
    ctx: Arc<BrowserContext>,
    networks: Arc<ChainParamsTable>,
    default_chain: u64,
    cluster: SolanaCluster,
) -> MultiChainWallet {
    MultiChainWallet::new(
        meta(),
        ctx,
        Arc::new(detect_evm),
        SecondaryConnector::Solana {
            detector: Arc::new(detect_solana),
            cluster,
        },
        networks,
    )
    .with_default_chain(Some(default_chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wmux::{ChainRef, UnifiedWalletProvider};
    use wmux_evm::ProviderFlags;
    use wmux_evm::testing::MockEip1193;

    #[test]
    fn test_extension_object_wins_over_flagged_ethereum() {
        let flags = ProviderFlags {
            is_coinbase_wallet: true,
            ..ProviderFlags::default()
        };
        let flagged: Arc<dyn Eip1193Provider> = Arc::new(MockEip1193::new().with_flags(flags));
        let extension: Arc<dyn Eip1193Provider> = Arc::new(MockEip1193::new());

        let window = BrowserWindow::new().with_ethereum(Arc::clone(&flagged));
        assert!(Arc::ptr_eq(&detect_evm(&window).unwrap(), &flagged));

        let window = window.with_coinbase_extension(Arc::clone(&extension));
        assert!(Arc::ptr_eq(&detect_evm(&window).unwrap(), &extension));
    }

    #[tokio::test]
    async fn test_connect_switches_to_base() {
        let mock = Arc::new(
            MockEip1193::new()
                .respond("eth_requestAccounts", json!(["0xabc0000000000000000000000000000000000001"]))
                .respond_once("eth_chainId", json!("0x1"))
                .respond("eth_chainId", json!("0x2105"))
                .respond("wallet_switchEthereumChain", json!(null)),
        );
        let ctx = BrowserContext::new(
            BrowserWindow::new().with_coinbase_extension(Arc::clone(&mock) as Arc<dyn Eip1193Provider>),
        );
        let wallet = wallet(
            Arc::new(ctx),
            Arc::new(ChainParamsTable::known()),
            DEFAULT_CHAIN,
            SolanaCluster::MainnetBeta,
        );
        let accounts = wallet.connect(Some(ChainType::Evm)).await.unwrap();
        assert_eq!(accounts[0].chain_id, ChainRef::Evm(DEFAULT_CHAIN));
        assert_eq!(
            mock.calls_for("wallet_switchEthereumChain"),
            vec![json!([{ "chainId": "0x2105" }])]
        );
    }
}
