//! SubWallet (EVM + Polkadot).

use std::sync::Arc;
use wmux::{ChainType, WalletCategory, WalletMeta};
use wmux_dot::{PolkadotExtension, PolkadotNetwork};
use wmux_evm::{ChainParamsTable, Eip1193Provider};

use crate::detect::injected_web3;
use crate::env::{BrowserContext, BrowserWindow};
use crate::multichain::{MultiChainWallet, SecondaryConnector};

/// Display name.
pub const NAME: &str = "SubWallet";
/// Icon asset.
pub const ICON: &str = "/wallets/subwallet.svg";
/// Key under `window.injectedWeb3`.
pub const EXTENSION_NAME: &str = "subwallet-js";

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

/// `window.SubWallet`.
#[must_use]
pub fn detect_evm(window: &BrowserWindow) -> Option<Arc<dyn Eip1193Provider>> {
    window.subwallet.clone()
}

/// `window.injectedWeb3["subwallet-js"]`.
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

#[cfg(test)]
mod tests {
    use super::*;
    use wmux::{SignableMessage, UnifiedWalletProvider};
    use wmux_dot::testing::MockPolkadotExtension;
    use wmux_dot::{InjectedAccount, RawPayloadKind};

    const KUSAMA_ACCOUNT: &str = "HNZata7iMYWmk5RvZRTiAsSDhV8366zq2YGb3tLH5Upf74F";

    #[tokio::test]
    async fn test_sign_message_uses_bytes_payload() {
        let ext = MockPolkadotExtension::new().with_account(InjectedAccount::new(KUSAMA_ACCOUNT));
        let wallet = wallet(
            Arc::new(BrowserContext::new(
                BrowserWindow::new().with_injected_web3(EXTENSION_NAME, Arc::new(ext.clone())),
            )),
            Arc::new(ChainParamsTable::known()),
            None,
            "wmux",
            PolkadotNetwork::Kusama,
        );
        wallet.connect(None).await.unwrap();
        let signature = wallet
            .sign_message(&SignableMessage::from("hi"), ChainType::Polkadot)
            .await
            .unwrap();
        assert_eq!(signature, ext.signature());
        let requests = ext.sign_requests();
        assert_eq!(requests[0].kind, RawPayloadKind::Bytes);
        assert_eq!(requests[0].data, "0x6869");
        assert_eq!(requests[0].address, KUSAMA_ACCOUNT);
    }
}
