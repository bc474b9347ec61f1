//! Shared implementation for EVM-only browser wallets.
//!
//! A wallet is an [`EvmWallet`] configured with its metadata and an
//! [`EvmDetector`]; everything else delegates to one [`EvmAdapter`] created
//! on `connect` and dropped on `disconnect`.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wmux::events::{EventSubscription, WalletEventHandlers};
use wmux::{
    ChainRef, ChainType, SignableMessage, UnifiedAccount, UnifiedTransactionRequest,
    UnifiedWalletProvider, WalletError, WalletMeta,
};
use wmux_evm::{ChainParamsTable, Eip1193Provider, EvmAdapter};

use crate::detect::EvmDetector;
use crate::env::BrowserContext;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Logs a provider-level failure and hands it back.
pub(crate) fn logged(wallet: &str, operation: &'static str, err: WalletError) -> WalletError {
    tracing::warn!(wallet, operation, error = %err, "Wallet operation failed");
    err
}

/// An EVM-only wallet backed by one injected EIP-1193 object.
pub struct EvmWallet {
    meta: WalletMeta,
    ctx: Arc<BrowserContext>,
    detector: EvmDetector,
    networks: Arc<ChainParamsTable>,
    default_chain: Option<u64>,
    adapter: Mutex<Option<Arc<EvmAdapter>>>,
    subscription: Mutex<Option<EventSubscription>>,
}

impl EvmWallet {
    /// Creates a wallet that finds its provider with `detector`.
    pub fn new(
        meta: WalletMeta,
        ctx: Arc<BrowserContext>,
        detector: EvmDetector,
        networks: Arc<ChainParamsTable>,
    ) -> Self {
        Self {
            meta,
            ctx,
            detector,
            networks,
            default_chain: None,
            adapter: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    /// Switches to `chain_id` on every connect.
    #[must_use]
    pub const fn with_default_chain(mut self, chain_id: Option<u64>) -> Self {
        self.default_chain = chain_id;
        self
    }

    /// Replaces the detector.
    #[must_use]
    pub fn with_detector(mut self, detector: EvmDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Returns the injected provider, if present.
    #[must_use]
    pub fn provider(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.ctx.window().and_then(|window| (self.detector)(&window))
    }

    /// Returns the connected adapter.
    #[must_use]
    pub fn adapter(&self) -> Option<Arc<EvmAdapter>> {
        lock(&self.adapter).clone()
    }

    fn require_adapter(&self, operation: &'static str) -> Result<Arc<EvmAdapter>, WalletError> {
        self.adapter().ok_or_else(|| {
            logged(
                self.name(),
                operation,
                WalletError::NotConnected {
                    wallet: self.meta.name.clone(),
                    chain_type: ChainType::Evm,
                },
            )
        })
    }

    fn require_evm(&self, operation: &'static str, chain_type: ChainType) -> Result<(), WalletError> {
        if chain_type == ChainType::Evm {
            return Ok(());
        }
        Err(logged(
            self.name(),
            operation,
            WalletError::unsupported(
                self.meta.name.as_str(),
                operation,
                format!("{} is an EVM-only wallet", self.meta.name),
            ),
        ))
    }
}

#[async_trait]
impl UnifiedWalletProvider for EvmWallet {
    fn meta(&self) -> &WalletMeta {
        &self.meta
    }

    fn detected_chains(&self) -> Vec<ChainType> {
        if self.provider().is_some() {
            vec![ChainType::Evm]
        } else {
            Vec::new()
        }
    }

    fn is_installed(&self) -> bool {
        self.provider().is_some()
    }

    async fn connect(
        &self,
        chain_type: Option<ChainType>,
    ) -> Result<Vec<UnifiedAccount>, WalletError> {
        if let Some(chain_type) = chain_type {
            self.require_evm("connect", chain_type)?;
        }
        let provider = self.provider().ok_or_else(|| {
            logged(
                self.name(),
                "connect",
                WalletError::NotInstalled {
                    wallet: self.meta.name.clone(),
                },
            )
        })?;
        lock(&self.subscription).take();
        let adapter = Arc::new(EvmAdapter::new(
            self.meta.name.as_str(),
            provider,
            Arc::clone(&self.networks),
        ));
        let accounts = adapter
            .connect(self.default_chain)
            .await
            .map_err(|err| logged(self.name(), "connect", err))?;
        *lock(&self.adapter) = Some(adapter);
        Ok(accounts)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        lock(&self.subscription).take();
        if let Some(adapter) = lock(&self.adapter).take() {
            adapter.disconnect();
        }
        Ok(())
    }

    async fn get_accounts(
        &self,
        chain_type: Option<ChainType>,
    ) -> Result<Vec<UnifiedAccount>, WalletError> {
        if chain_type.is_some_and(|t| t != ChainType::Evm) {
            return Ok(Vec::new());
        }
        match self.adapter() {
            Some(adapter) => adapter
                .get_accounts()
                .await
                .map_err(|err| logged(self.name(), "get_accounts", err)),
            None => Ok(Vec::new()),
        }
    }

    async fn switch_chain(
        &self,
        chain_id: ChainRef,
        chain_type: ChainType,
    ) -> Result<(), WalletError> {
        self.require_evm("switch_chain", chain_type)?;
        let id = chain_id.as_evm().ok_or_else(|| {
            logged(
                self.name(),
                "switch_chain",
                WalletError::invalid(self.meta.name.as_str(), "chain_id", format!("{chain_id} is not an EVM chain id")),
            )
        })?;
        let adapter = self.require_adapter("switch_chain")?;
        adapter
            .switch_chain(id)
            .await
            .map_err(|err| logged(self.name(), "switch_chain", err))
    }

    async fn sign_transaction(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        self.require_evm("sign_transaction", tx.chain_type)?;
        let adapter = self.require_adapter("sign_transaction")?;
        adapter
            .sign_transaction(tx)
            .await
            .map_err(|err| logged(self.name(), "sign_transaction", err))
    }

    async fn sign_message(
        &self,
        message: &SignableMessage,
        chain_type: ChainType,
    ) -> Result<String, WalletError> {
        self.require_evm("sign_message", chain_type)?;
        let adapter = self.require_adapter("sign_message")?;
        adapter
            .sign_message(message)
            .await
            .map_err(|err| logged(self.name(), "sign_message", err))
    }

    fn watch(&self, handlers: WalletEventHandlers) -> Result<(), WalletError> {
        let adapter = self.require_adapter("watch")?;
        let subscription = adapter.setup_event_listeners(&handlers);
        *lock(&self.subscription) = Some(subscription);
        Ok(())
    }
}

impl std::fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWallet")
            .field("name", &self.meta.name)
            .field("default_chain", &self.default_chain)
            .field("connected", &self.adapter().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::BrowserWindow;
    use serde_json::json;
    use wmux::WalletCategory;
    use wmux_evm::ProviderEvent;
    use wmux_evm::testing::MockEip1193;

    const ALICE: &str = "0xabc0000000000000000000000000000000000001";

    fn wallet(ctx: BrowserContext) -> EvmWallet {
        EvmWallet::new(
            WalletMeta::new("Test", "", WalletCategory::Browser, vec![ChainType::Evm]),
            Arc::new(ctx),
            Arc::new(|w: &BrowserWindow| w.ethereum.clone()),
            Arc::new(ChainParamsTable::known()),
        )
    }

    fn installed(mock: &Arc<MockEip1193>) -> BrowserContext {
        BrowserContext::new(BrowserWindow::new().with_ethereum(Arc::clone(mock) as Arc<dyn Eip1193Provider>))
    }

    fn scripted() -> Arc<MockEip1193> {
        Arc::new(
            MockEip1193::new()
                .respond("eth_requestAccounts", json!([ALICE]))
                .respond("eth_accounts", json!([ALICE]))
                .respond("eth_chainId", json!("0x1")),
        )
    }

    #[tokio::test]
    async fn test_headless_context_is_not_installed() {
        let wallet = wallet(BrowserContext::headless());
        assert!(!wallet.is_installed());
        assert!(wallet.detected_chains().is_empty());
        let err = wallet.connect(None).await.unwrap_err();
        assert!(matches!(err, WalletError::NotInstalled { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_without_connect() {
        let wallet = wallet(BrowserContext::headless());
        wallet.disconnect().await.unwrap();
        assert!(wallet.get_accounts(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_then_get_accounts() {
        let mock = scripted();
        let wallet = wallet(installed(&mock));
        let accounts = wallet.connect(Some(ChainType::Evm)).await.unwrap();
        assert_eq!(accounts[0].name, "Primary Account");
        let again = wallet.get_accounts(Some(ChainType::Evm)).await.unwrap();
        assert_eq!(again, accounts);
        assert!(wallet.get_accounts(Some(ChainType::Solana)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_evm_connect_is_unsupported() {
        let mock = scripted();
        let wallet = wallet(installed(&mock));
        let err = wallet.connect(Some(ChainType::Polkadot)).await.unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { .. }));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_family_is_unsupported_before_connection_check() {
        let mock = scripted();
        let wallet = wallet(installed(&mock));
        let err = wallet
            .sign_transaction(&UnifiedTransactionRequest::solana("AQID"))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { operation: "sign_transaction", .. }));

        let err = wallet
            .sign_message(&SignableMessage::from("hi"), ChainType::Solana)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { operation: "sign_message", .. }));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_default_chain_switches_on_connect() {
        let mock = Arc::new(
            MockEip1193::new()
                .respond("eth_requestAccounts", json!([ALICE]))
                .respond_once("eth_chainId", json!("0x1"))
                .respond("eth_chainId", json!("0x2105"))
                .respond("wallet_switchEthereumChain", json!(null)),
        );
        let wallet = wallet(installed(&mock)).with_default_chain(Some(8453));
        let accounts = wallet.connect(None).await.unwrap();
        assert_eq!(accounts[0].chain_id, ChainRef::Evm(8453));
    }

    #[tokio::test]
    async fn test_watch_and_disconnect_cleanup() {
        let mock = scripted();
        let wallet = wallet(installed(&mock));
        let handlers = WalletEventHandlers::new(|_| {}, |_| {}, || {});
        assert!(wallet.watch(handlers.clone()).is_err());

        wallet.connect(None).await.unwrap();
        wallet.watch(handlers.clone()).unwrap();
        wallet.watch(handlers).unwrap();
        assert_eq!(mock.listener_count(ProviderEvent::AccountsChanged), 1);

        wallet.disconnect().await.unwrap();
        assert_eq!(mock.listener_count(ProviderEvent::AccountsChanged), 0);
        assert_eq!(mock.listener_count(ProviderEvent::Disconnect), 0);
    }

    #[tokio::test]
    async fn test_switch_chain_rejects_named_reference() {
        let mock = scripted();
        let wallet = wallet(installed(&mock));
        wallet.connect(None).await.unwrap();
        let err = wallet
            .switch_chain(ChainRef::named("devnet"), ChainType::Evm)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput { .. }));
    }
}
