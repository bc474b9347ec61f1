//! Phantom (EVM + Solana).

use std::sync::Arc;
use wmux::{ChainType, WalletCategory, WalletMeta};
use wmux_evm::{ChainParamsTable, Eip1193Provider};
use wmux_svm::{SolanaCluster, SolanaWallet};

use crate::env::{BrowserContext, BrowserWindow};
use crate::multichain::{MultiChainWallet, SecondaryConnector};

/// Display name.
pub const NAME: &str = "Phantom";
/// Icon asset.
pub const ICON: &str = "/wallets/phantom.svg";

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

/// `window.phantom.ethereum`.
#[must_use]
pub fn detect_evm(window: &BrowserWindow) -> Option<Arc<dyn Eip1193Provider>> {
    window.phantom.ethereum.clone()
}

/// `window.phantom.solana`, if it carries `isPhantom`.
#[must_use]
pub fn detect_solana(window: &BrowserWindow) -> Option<Arc<dyn SolanaWallet>> {
    window
        .phantom
        .solana
        .as_ref()
        .filter(|wallet| wallet.flags().is_phantom)
        .cloned()
}

/// Builds the provider.
#[must_use]
pub fn wallet(
    ctx: Arc<BrowserContext>,
    networks: Arc<ChainParamsTable>,
    default_chain: Option<u64>,
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
    .with_default_chain(default_chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wmux::UnifiedWalletProvider;
    use wmux_svm::SolanaWalletFlags;
    use wmux_svm::testing::MockSolanaWallet;

    const KEY: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn phantom_flags() -> SolanaWalletFlags {
        SolanaWalletFlags {
            is_phantom: true,
            ..SolanaWalletFlags::default()
        }
    }

    #[test]
    fn test_solana_object_needs_phantom_flag() {
        let unflagged = BrowserWindow::new().with_phantom_solana(Arc::new(MockSolanaWallet::new(KEY)));
        assert!(detect_solana(&unflagged).is_none());

        let flagged = BrowserWindow::new()
            .with_phantom_solana(Arc::new(MockSolanaWallet::new(KEY).with_flags(phantom_flags())));
        assert!(detect_solana(&flagged).is_some());
    }

    #[tokio::test]
    async fn test_solana_only_install_connects() {
        let ctx = BrowserContext::new(
            BrowserWindow::new()
                .with_phantom_solana(Arc::new(MockSolanaWallet::new(KEY).with_flags(phantom_flags()))),
        );
        let wallet = wallet(
            Arc::new(ctx),
            Arc::new(ChainParamsTable::known()),
            None,
            SolanaCluster::Devnet,
        );
        assert_eq!(wallet.detected_chains(), vec![ChainType::Solana]);
        let accounts = wallet.connect(None).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].chain_name, "Solana Devnet");
        assert_eq!(accounts[0].source, NAME);
    }
}
