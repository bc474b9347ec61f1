//! Rabby.

use std::sync::Arc;
use wmux::{ChainType, WalletCategory, WalletMeta};
use wmux_evm::{ChainParamsTable, Eip1193Provider};

use crate::detect::find_ethereum;
use crate::env::{BrowserContext, BrowserWindow};
use crate::evm_wallet::EvmWallet;

/// Display name.
pub const NAME: &str = "Rabby";
/// Icon asset.
pub const ICON: &str = "/wallets/rabby.svg";

/// Static metadata.
#[must_use]
pub fn meta() -> WalletMeta {
    WalletMeta::new(NAME, ICON, WalletCategory::Browser, vec![ChainType::Evm])
}

/// Finds an object flagged `isRabby`.
#[must_use]
pub fn detect(window: &BrowserWindow) -> Option<Arc<dyn Eip1193Provider>> {
    find_ethereum(window, |flags| flags.is_rabby)
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wmux::UnifiedWalletProvider;
    use wmux_evm::ProviderFlags;
    use wmux_evm::testing::MockEip1193;

    #[tokio::test]
    async fn test_connects_through_rabby_object() {
        let flags = ProviderFlags {
            is_meta_mask: true,
            is_rabby: true,
            ..ProviderFlags::default()
        };
        let mock = Arc::new(
            MockEip1193::new()
                .with_flags(flags)
                .respond("eth_requestAccounts", json!(["0xabc0000000000000000000000000000000000001"]))
                .respond("eth_chainId", json!("0x89")),
        );
        let ctx = BrowserContext::new(
            BrowserWindow::new().with_ethereum(Arc::clone(&mock) as Arc<dyn Eip1193Provider>),
        );
        let wallet = wallet(Arc::new(ctx), Arc::new(ChainParamsTable::known()), None);
        let accounts = wallet.connect(None).await.unwrap();
        assert_eq!(accounts[0].source, NAME);
        assert_eq!(accounts[0].chain_name, "Polygon");
    }
}
