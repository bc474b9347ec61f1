//! Shared implementation for wallets spanning EVM plus one other family.
//!
//! A [`MultiChainWallet`] holds an EVM slot and a secondary slot. `connect`
//! dispatches on the requested family; with no family given it tries both
//! sides and succeeds if either produced accounts.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use wmux::events::{EventSubscription, WalletEventHandlers};
use wmux::{
    ChainRef, ChainType, SecondaryChainAdapter, SignableMessage, UnifiedAccount,
    UnifiedTransactionRequest, UnifiedWalletProvider, WalletError, WalletMeta,
};
use wmux_dot::{PolkadotAdapter, PolkadotNetwork};
use wmux_evm::{ChainParamsTable, Eip1193Provider, EvmAdapter};
use wmux_svm::{SolanaAdapter, SolanaCluster};

use crate::detect::{EvmDetector, PolkadotDetector, SolanaDetector};
use crate::env::{BrowserContext, BrowserWindow};
use crate::evm_wallet::{lock, logged};

/// How a wallet reaches its non-EVM side.
#[derive(Clone)]
pub enum SecondaryConnector {
    /// A wallet-standard Solana object.
    Solana {
        /// Finds the object.
        detector: SolanaDetector,
        /// Cluster accounts are reported on.
        cluster: SolanaCluster,
    },
    /// A `window.injectedWeb3` extension.
    Polkadot {
        /// Finds the extension.
        detector: PolkadotDetector,
        /// Name passed to `enable`.
        app_name: String,
        /// Relay chain accounts are filtered to.
        network: PolkadotNetwork,
    },
}

impl SecondaryConnector {
    /// Chain family of this side.
    #[must_use]
    pub const fn chain_type(&self) -> ChainType {
        match self {
            Self::Solana { .. } => ChainType::Solana,
            Self::Polkadot { .. } => ChainType::Polkadot,
        }
    }

    /// Returns `true` if the injected object is present.
    #[must_use]
    pub fn is_present(&self, window: &BrowserWindow) -> bool {
        match self {
            Self::Solana { detector, .. } => detector(window).is_some(),
            Self::Polkadot { detector, .. } => detector(window).is_some(),
        }
    }

    /// Builds and connects the adapter for this side. `Ok(None)` means the
    /// injected object is absent.
    async fn connect(
        &self,
        wallet: &str,
        window: &BrowserWindow,
    ) -> Result<Option<(Arc<dyn SecondaryChainAdapter>, Vec<UnifiedAccount>)>, WalletError> {
        match self {
            Self::Solana { detector, cluster } => {
                let Some(inner) = detector(window) else {
                    return Ok(None);
                };
                let adapter = Arc::new(SolanaAdapter::new(wallet, inner, *cluster));
                let accounts = adapter.connect().await?;
                Ok(Some((adapter, accounts)))
            }
            Self::Polkadot {
                detector,
                app_name,
                network,
            } => {
                let Some(extension) = detector(window) else {
                    return Ok(None);
                };
                let adapter = Arc::new(PolkadotAdapter::new(
                    wallet,
                    extension,
                    app_name.as_str(),
                    *network,
                ));
                let accounts = adapter.connect().await?;
                Ok(Some((adapter, accounts)))
            }
        }
    }
}

impl std::fmt::Debug for SecondaryConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solana { cluster, .. } => f
                .debug_struct("Solana")
                .field("cluster", cluster)
                .finish_non_exhaustive(),
            Self::Polkadot {
                app_name, network, ..
            } => f
                .debug_struct("Polkadot")
                .field("app_name", app_name)
                .field("network", network)
                .finish_non_exhaustive(),
        }
    }
}

/// A wallet spanning EVM and one secondary chain family.
pub struct MultiChainWallet {
    meta: WalletMeta,
    ctx: Arc<BrowserContext>,
    evm_detector: EvmDetector,
    networks: Arc<ChainParamsTable>,
    default_chain: Option<u64>,
    secondary: SecondaryConnector,
    evm: Mutex<Option<Arc<EvmAdapter>>>,
    other: Mutex<Option<Arc<dyn SecondaryChainAdapter>>>,
    subscription: Mutex<Option<EventSubscription>>,
}

impl MultiChainWallet {
    /// Creates a wallet from its EVM detector and secondary connector.
    pub fn new(
        meta: WalletMeta,
        ctx: Arc<BrowserContext>,
        evm_detector: EvmDetector,
        secondary: SecondaryConnector,
        networks: Arc<ChainParamsTable>,
    ) -> Self {
        Self {
            meta,
            ctx,
            evm_detector,
            networks,
            default_chain: None,
            secondary,
            evm: Mutex::new(None),
            other: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    /// Switches the EVM side to `chain_id` on every connect.
    #[must_use]
    pub const fn with_default_chain(mut self, chain_id: Option<u64>) -> Self {
        self.default_chain = chain_id;
        self
    }

    /// Replaces the EVM detector.
    #[must_use]
    pub fn with_detector(mut self, detector: EvmDetector) -> Self {
        self.evm_detector = detector;
        self
    }

    /// Replaces the secondary connector.
    #[must_use]
    pub fn with_secondary(mut self, secondary: SecondaryConnector) -> Self {
        self.secondary = secondary;
        self
    }

    /// Chain family of the secondary side.
    #[must_use]
    pub const fn secondary_chain_type(&self) -> ChainType {
        self.secondary.chain_type()
    }

    /// Returns the EVM provider, if injected.
    #[must_use]
    pub fn evm_provider(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.ctx.window().and_then(|window| (self.evm_detector)(&window))
    }

    /// Returns the connected EVM adapter.
    #[must_use]
    pub fn evm_adapter(&self) -> Option<Arc<EvmAdapter>> {
        lock(&self.evm).clone()
    }

    /// Returns the connected secondary adapter.
    #[must_use]
    pub fn secondary_adapter(&self) -> Option<Arc<dyn SecondaryChainAdapter>> {
        lock(&self.other).clone()
    }

    fn not_connected(&self, operation: &'static str, chain_type: ChainType) -> WalletError {
        logged(
            self.name(),
            operation,
            WalletError::NotConnected {
                wallet: self.meta.name.clone(),
                chain_type,
            },
        )
    }

    fn unsupported_family(&self, operation: &'static str, chain_type: ChainType) -> WalletError {
        logged(
            self.name(),
            operation,
            WalletError::unsupported(
                self.meta.name.as_str(),
                operation,
                format!("{} does not support {}", self.meta.name, chain_type.display_name()),
            ),
        )
    }

    async fn connect_evm(&self, window: &BrowserWindow) -> Result<Option<Vec<UnifiedAccount>>, WalletError> {
        let Some(provider) = (self.evm_detector)(window) else {
            return Ok(None);
        };
        lock(&self.subscription).take();
        if let Some(previous) = lock(&self.evm).take() {
            previous.disconnect();
        }
        let adapter = Arc::new(EvmAdapter::new(
            self.meta.name.as_str(),
            provider,
            Arc::clone(&self.networks),
        ));
        let accounts = adapter.connect(self.default_chain).await?;
        *lock(&self.evm) = Some(adapter);
        Ok(Some(accounts))
    }

    async fn connect_secondary(
        &self,
        window: &BrowserWindow,
    ) -> Result<Option<Vec<UnifiedAccount>>, WalletError> {
        let previous = lock(&self.other).take();
        if let Some(previous) = previous {
            previous.disconnect().await?;
        }
        match self.secondary.connect(&self.meta.name, window).await? {
            Some((adapter, accounts)) => {
                *lock(&self.other) = Some(adapter);
                Ok(Some(accounts))
            }
            None => Ok(None),
        }
    }

    async fn connect_family(
        &self,
        chain_type: ChainType,
        window: &BrowserWindow,
    ) -> Result<Option<Vec<UnifiedAccount>>, WalletError> {
        if chain_type == ChainType::Evm {
            self.connect_evm(window).await
        } else {
            self.connect_secondary(window).await
        }
    }
}

#[async_trait]
impl UnifiedWalletProvider for MultiChainWallet {
    fn meta(&self) -> &WalletMeta {
        &self.meta
    }

    fn detected_chains(&self) -> Vec<ChainType> {
        let Some(window) = self.ctx.window() else {
            return Vec::new();
        };
        let mut chains = Vec::with_capacity(2);
        if (self.evm_detector)(&window).is_some() {
            chains.push(ChainType::Evm);
        }
        if self.secondary.is_present(&window) {
            chains.push(self.secondary.chain_type());
        }
        chains
    }

    fn is_installed(&self) -> bool {
        !self.detected_chains().is_empty()
    }

    async fn connect(
        &self,
        chain_type: Option<ChainType>,
    ) -> Result<Vec<UnifiedAccount>, WalletError> {
        let not_installed = || {
            logged(
                self.name(),
                "connect",
                WalletError::NotInstalled {
                    wallet: self.meta.name.clone(),
                },
            )
        };
        let window = self.ctx.window().ok_or_else(not_installed)?;

        if let Some(chain_type) = chain_type {
            if !self.meta.supports(chain_type) {
                return Err(self.unsupported_family("connect", chain_type));
            }
            let accounts = self
                .connect_family(chain_type, &window)
                .await
                .map_err(|err| logged(self.name(), "connect", err))?;
            return match accounts {
                Some(accounts) => Ok(accounts),
                None => Err(not_installed()),
            };
        }

        if !self.is_installed() {
            return Err(not_installed());
        }
        let mut connected = Vec::new();
        let mut last_error = None;
        for family in [ChainType::Evm, self.secondary.chain_type()] {
            match self.connect_family(family, &window).await {
                Ok(Some(accounts)) => connected.extend(accounts),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(wallet = %self.meta.name, chain_type = %family, error = %err, "Chain connection failed");
                    last_error = Some(Box::new(err));
                }
            }
        }
        if connected.is_empty() {
            return Err(logged(
                self.name(),
                "connect",
                WalletError::NoAccountsConnected {
                    wallet: self.meta.name.clone(),
                    source: last_error,
                },
            ));
        }
        tracing::info!(wallet = %self.meta.name, accounts = connected.len(), "Multi-chain wallet connected");
        Ok(connected)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        lock(&self.subscription).take();
        if let Some(evm) = lock(&self.evm).take() {
            evm.disconnect();
        }
        let other = lock(&self.other).take();
        if let Some(other) = other {
            other
                .disconnect()
                .await
                .map_err(|err| logged(self.name(), "disconnect", err))?;
        }
        Ok(())
    }

    async fn get_accounts(
        &self,
        chain_type: Option<ChainType>,
    ) -> Result<Vec<UnifiedAccount>, WalletError> {
        let wants = |family: ChainType| chain_type.is_none_or(|t| t == family);
        let mut accounts = Vec::new();
        if wants(ChainType::Evm) {
            if let Some(evm) = self.evm_adapter() {
                accounts.extend(
                    evm.get_accounts()
                        .await
                        .map_err(|err| logged(self.name(), "get_accounts", err))?,
                );
            }
        }
        if wants(self.secondary.chain_type()) {
            if let Some(other) = self.secondary_adapter() {
                accounts.extend(
                    other
                        .get_accounts()
                        .await
                        .map_err(|err| logged(self.name(), "get_accounts", err))?,
                );
            }
        }
        Ok(accounts)
    }

    async fn switch_chain(
        &self,
        chain_id: ChainRef,
        chain_type: ChainType,
    ) -> Result<(), WalletError> {
        if chain_type == ChainType::Evm {
            let evm = self
                .evm_adapter()
                .ok_or_else(|| self.not_connected("switch_chain", chain_type))?;
            return SecondaryChainAdapter::switch_chain(evm.as_ref(), &chain_id)
                .await
                .map_err(|err| logged(self.name(), "switch_chain", err));
        }
        if chain_type != self.secondary.chain_type() {
            return Err(self.unsupported_family("switch_chain", chain_type));
        }
        let other = self
            .secondary_adapter()
            .ok_or_else(|| self.not_connected("switch_chain", chain_type))?;
        let result = if other.supports_cluster_switch() {
            other.switch_cluster(&chain_id.to_string()).await
        } else if other.supports_chain_switch() {
            other.switch_chain(&chain_id).await
        } else {
            tracing::info!(
                wallet = %self.meta.name,
                %chain_type,
                %chain_id,
                "Chain switching not supported, ignoring request"
            );
            Ok(())
        };
        result.map_err(|err| logged(self.name(), "switch_chain", err))
    }

    async fn sign_transaction(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        let family = tx.chain_type;
        if family == ChainType::Evm {
            let evm = self
                .evm_adapter()
                .ok_or_else(|| self.not_connected("sign_transaction", family))?;
            return evm
                .sign_transaction(tx)
                .await
                .map_err(|err| logged(self.name(), "sign_transaction", err));
        }
        if family != self.secondary.chain_type() {
            return Err(self.unsupported_family("sign_transaction", family));
        }
        let other = self
            .secondary_adapter()
            .ok_or_else(|| self.not_connected("sign_transaction", family))?;
        other
            .sign_transaction(tx)
            .await
            .map_err(|err| logged(self.name(), "sign_transaction", err))
    }

    async fn sign_message(
        &self,
        message: &SignableMessage,
        chain_type: ChainType,
    ) -> Result<String, WalletError> {
        if chain_type == ChainType::Evm {
            let evm = self
                .evm_adapter()
                .ok_or_else(|| self.not_connected("sign_message", chain_type))?;
            return evm
                .sign_message(message)
                .await
                .map_err(|err| logged(self.name(), "sign_message", err));
        }
        if chain_type != self.secondary.chain_type() {
            return Err(self.unsupported_family("sign_message", chain_type));
        }
        let other = self
            .secondary_adapter()
            .ok_or_else(|| self.not_connected("sign_message", chain_type))?;
        other
            .sign_message(message)
            .await
            .map_err(|err| logged(self.name(), "sign_message", err))
    }

    fn watch(&self, handlers: WalletEventHandlers) -> Result<(), WalletError> {
        let evm = self
            .evm_adapter()
            .ok_or_else(|| self.not_connected("watch", ChainType::Evm))?;
        *lock(&self.subscription) = Some(evm.setup_event_listeners(&handlers));
        Ok(())
    }
}

impl std::fmt::Debug for MultiChainWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiChainWallet")
            .field("name", &self.meta.name)
            .field("secondary", &self.secondary)
            .field("default_chain", &self.default_chain)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wmux::{ProviderRpcError, WalletCategory};
    use wmux_dot::InjectedAccount;
    use wmux_dot::testing::MockPolkadotExtension;
    use wmux_evm::testing::MockEip1193;
    use wmux_svm::SolanaWallet;
    use wmux_svm::testing::MockSolanaWallet;

    const ALICE_EVM: &str = "0xabc0000000000000000000000000000000000001";
    const ALICE_SOL: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const ALICE_DOT: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    fn evm_mock() -> Arc<MockEip1193> {
        Arc::new(
            MockEip1193::new()
                .respond("eth_requestAccounts", json!([ALICE_EVM]))
                .respond("eth_chainId", json!("0x1"))
                .respond("wallet_switchEthereumChain", json!(null)),
        )
    }

    fn solana_wallet(window: BrowserWindow) -> MultiChainWallet {
        MultiChainWallet::new(
            WalletMeta::new(
                "Phantom",
                "",
                WalletCategory::Multichain,
                vec![ChainType::Evm, ChainType::Solana],
            ),
            Arc::new(BrowserContext::new(window)),
            Arc::new(|w: &BrowserWindow| w.phantom.ethereum.clone()),
            SecondaryConnector::Solana {
                detector: Arc::new(|w: &BrowserWindow| w.phantom.solana.clone()),
                cluster: SolanaCluster::MainnetBeta,
            },
            Arc::new(ChainParamsTable::known()),
        )
    }

    fn polkadot_wallet(window: BrowserWindow) -> MultiChainWallet {
        MultiChainWallet::new(
            WalletMeta::new(
                "Talisman",
                "",
                WalletCategory::Multichain,
                vec![ChainType::Evm, ChainType::Polkadot],
            ),
            Arc::new(BrowserContext::new(window)),
            Arc::new(|w: &BrowserWindow| w.talisman_eth.clone()),
            SecondaryConnector::Polkadot {
                detector: Arc::new(|w: &BrowserWindow| w.injected_web3.get("talisman").cloned()),
                app_name: "wmux".to_owned(),
                network: PolkadotNetwork::Polkadot,
            },
            Arc::new(ChainParamsTable::known()),
        )
    }

    #[tokio::test]
    async fn test_connect_all_accumulates_both_sides() {
        let sol = Arc::new(MockSolanaWallet::new(ALICE_SOL));
        let wallet = solana_wallet(
            BrowserWindow::new()
                .with_phantom_ethereum(evm_mock())
                .with_phantom_solana(sol as Arc<dyn SolanaWallet>),
        );
        assert_eq!(wallet.detected_chains(), vec![ChainType::Evm, ChainType::Solana]);
        let accounts = wallet.connect(None).await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].chain_type, ChainType::Evm);
        assert_eq!(accounts[1].chain_type, ChainType::Solana);
    }

    #[tokio::test]
    async fn test_connect_all_tolerates_one_failing_side() {
        let sol = Arc::new(MockSolanaWallet::new(ALICE_SOL));
        let evm = Arc::new(MockEip1193::new().fail(
            "eth_requestAccounts",
            ProviderRpcError::user_rejected("User rejected the request."),
        ));
        let wallet = solana_wallet(
            BrowserWindow::new()
                .with_phantom_ethereum(evm)
                .with_phantom_solana(sol as Arc<dyn SolanaWallet>),
        );
        let accounts = wallet.connect(None).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].chain_type, ChainType::Solana);
        assert!(wallet.evm_adapter().is_none());
    }

    #[tokio::test]
    async fn test_no_accounts_connected_keeps_cause() {
        let evm = Arc::new(MockEip1193::new().respond("eth_requestAccounts", json!([])));
        let wallet = solana_wallet(BrowserWindow::new().with_phantom_ethereum(evm));
        let err = wallet.connect(None).await.unwrap_err();
        match err {
            WalletError::NoAccountsConnected { source, .. } => {
                assert!(matches!(source.as_deref(), Some(WalletError::NoAccounts { .. })));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_explicit_family_propagates_failure() {
        let evm = Arc::new(MockEip1193::new().fail(
            "eth_requestAccounts",
            ProviderRpcError::user_rejected("User rejected the request."),
        ));
        let wallet = solana_wallet(BrowserWindow::new().with_phantom_ethereum(evm));
        let err = wallet.connect(Some(ChainType::Evm)).await.unwrap_err();
        assert!(err.is_user_rejected());

        let err = wallet.connect(Some(ChainType::Solana)).await.unwrap_err();
        assert!(matches!(err, WalletError::NotInstalled { .. }));

        let err = wallet.connect(Some(ChainType::Polkadot)).await.unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_headless_is_not_installed() {
        let wallet = solana_wallet(BrowserWindow::new());
        wallet.ctx.set_window(None);
        assert!(!wallet.is_installed());
        let err = wallet.connect(None).await.unwrap_err();
        assert!(matches!(err, WalletError::NotInstalled { .. }));
        wallet.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_solana_switch_uses_cluster() {
        let sol = Arc::new(MockSolanaWallet::new(ALICE_SOL));
        let wallet = solana_wallet(BrowserWindow::new().with_phantom_solana(sol as Arc<dyn SolanaWallet>));
        wallet.connect(Some(ChainType::Solana)).await.unwrap();
        wallet
            .switch_chain(ChainRef::named("devnet"), ChainType::Solana)
            .await
            .unwrap();
        let accounts = wallet.get_accounts(Some(ChainType::Solana)).await.unwrap();
        assert_eq!(accounts[0].chain_name, "Solana Devnet");
    }

    #[tokio::test]
    async fn test_polkadot_switch_is_a_no_op() {
        let ext = MockPolkadotExtension::new().with_account(InjectedAccount::new(ALICE_DOT));
        let wallet = polkadot_wallet(
            BrowserWindow::new().with_injected_web3("talisman", Arc::new(ext)),
        );
        let accounts = wallet.connect(Some(ChainType::Polkadot)).await.unwrap();
        wallet
            .switch_chain(ChainRef::named("kusama"), ChainType::Polkadot)
            .await
            .unwrap();
        let after = wallet.get_accounts(Some(ChainType::Polkadot)).await.unwrap();
        assert_eq!(after, accounts);
    }

    #[tokio::test]
    async fn test_dispatch_by_transaction_family() {
        let ext = MockPolkadotExtension::new().with_account(InjectedAccount::new(ALICE_DOT));
        let evm = evm_mock();
        let wallet = polkadot_wallet(
            BrowserWindow::new()
                .with_talisman_eth(Arc::clone(&evm) as Arc<dyn Eip1193Provider>)
                .with_injected_web3("talisman", Arc::new(ext.clone())),
        );
        wallet.connect(None).await.unwrap();

        let signature = wallet
            .sign_transaction(&UnifiedTransactionRequest::polkadot("", "0x01"))
            .await
            .unwrap();
        assert_eq!(signature, ext.signature());
        assert_eq!(evm.call_count("eth_sendTransaction"), 0);

        let err = wallet
            .sign_transaction(&UnifiedTransactionRequest::solana("AQID"))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_clears_both_sides() {
        let sol = Arc::new(MockSolanaWallet::new(ALICE_SOL));
        let wallet = solana_wallet(
            BrowserWindow::new()
                .with_phantom_ethereum(evm_mock())
                .with_phantom_solana(Arc::clone(&sol) as Arc<dyn SolanaWallet>),
        );
        wallet.connect(None).await.unwrap();
        wallet.disconnect().await.unwrap();
        assert!(wallet.evm_adapter().is_none());
        assert!(wallet.secondary_adapter().is_none());
        assert!(wallet.get_accounts(None).await.unwrap().is_empty());
        assert_eq!(sol.call_count(wmux_svm::testing::SolanaCall::Disconnect), 1);
    }
}
