//! Safe{Wallet}, when the page runs as a Safe App.
//!
//! The Safe Apps SDK talks to the host frame over `postMessage`. It is
//! reached through [`SafeSdkLoader`] so loading it is an explicit, observable
//! step that only happens inside a Safe frame.

use alloy_primitives::utils::parse_ether;
use alloy_primitives::{Address, hex};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use wmux::{
    ChainRef, ChainType, ProviderRpcError, SignableMessage, UnifiedAccount,
    UnifiedTransactionRequest, UnifiedWalletProvider, WalletCategory, WalletError, WalletMeta,
};
use wmux_evm::ChainParamsTable;

use crate::detect::is_safe_context;
use crate::env::BrowserContext;
use crate::evm_wallet::{lock, logged};

/// Display name.
pub const NAME: &str = "Safe";
/// Icon asset.
pub const ICON: &str = "/wallets/safe.svg";
/// Label of the single account a Safe exposes.
pub const ACCOUNT_NAME: &str = "Safe Account";

/// Static metadata.
#[must_use]
pub fn meta() -> WalletMeta {
    WalletMeta::new(NAME, ICON, WalletCategory::Institutional, vec![ChainType::Evm])
}

/// `sdk.safe.getInfo()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeInfo {
    /// Address of the Safe contract.
    pub safe_address: String,
    /// Chain the Safe is deployed on.
    pub chain_id: u64,
    /// Owner addresses.
    #[serde(default)]
    pub owners: Vec<String>,
    /// Confirmations required to execute.
    #[serde(default)]
    pub threshold: u32,
}

/// One entry of `sdk.txs.send({ txs })`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeTransaction {
    /// Recipient.
    pub to: String,
    /// Amount in wei, as a decimal string.
    pub value: String,
    /// 0x-hex calldata (`"0x"` for plain transfers).
    pub data: String,
}

/// Result of `sdk.txs.send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTxResponse {
    /// Hash of the proposed Safe transaction (not an on-chain hash).
    pub safe_tx_hash: String,
}

/// A loaded Safe Apps SDK.
#[async_trait]
pub trait SafeAppsSdk: Send + Sync + fmt::Debug {
    /// Reads the hosting Safe.
    ///
    /// # Errors
    ///
    /// Returns the host's error unchanged.
    async fn safe_info(&self) -> Result<SafeInfo, ProviderRpcError>;

    /// Proposes a batch of transactions to the Safe's owners.
    ///
    /// # Errors
    ///
    /// Returns the host's error unchanged.
    async fn send_transactions(
        &self,
        transactions: Vec<SafeTransaction>,
    ) -> Result<SafeTxResponse, ProviderRpcError>;
}

/// Imports and initialises the Safe Apps SDK.
#[async_trait]
pub trait SafeSdkLoader: Send + Sync + fmt::Debug {
    /// Loads the SDK.
    ///
    /// # Errors
    ///
    /// Returns the import or handshake failure.
    async fn load(&self) -> Result<Arc<dyn SafeAppsSdk>, ProviderRpcError>;
}

#[derive(Debug)]
struct SafeSession {
    sdk: Arc<dyn SafeAppsSdk>,
    info: SafeInfo,
}

/// A Safe multisig, connected through the host frame.
pub struct SafeWallet {
    meta: WalletMeta,
    ctx: Arc<BrowserContext>,
    allowed_origins: Vec<String>,
    loader: Option<Arc<dyn SafeSdkLoader>>,
    networks: Arc<ChainParamsTable>,
    session: Mutex<Option<Arc<SafeSession>>>,
}

impl SafeWallet {
    /// Creates the provider. Without a `loader`, `connect` reports the
    /// wallet as not installed.
    pub fn new(
        ctx: Arc<BrowserContext>,
        allowed_origins: Vec<String>,
        loader: Option<Arc<dyn SafeSdkLoader>>,
        networks: Arc<ChainParamsTable>,
    ) -> Self {
        Self {
            meta: meta(),
            ctx,
            allowed_origins,
            loader,
            networks,
            session: Mutex::new(None),
        }
    }

    /// Returns the connected Safe.
    #[must_use]
    pub fn safe_info(&self) -> Option<SafeInfo> {
        lock(&self.session).as_ref().map(|s| s.info.clone())
    }

    fn in_safe_frame(&self) -> bool {
        self.ctx
            .window()
            .is_some_and(|window| is_safe_context(&window, &self.allowed_origins))
    }

    fn account(&self, info: &SafeInfo) -> UnifiedAccount {
        UnifiedAccount::new(
            info.safe_address.as_str(),
            ChainType::Evm,
            ChainRef::Evm(info.chain_id),
            self.networks.chain_name(info.chain_id),
            NAME,
            ACCOUNT_NAME,
        )
    }

    fn require_session(&self, operation: &'static str) -> Result<Arc<SafeSession>, WalletError> {
        lock(&self.session).clone().ok_or_else(|| {
            logged(
                NAME,
                operation,
                WalletError::NotConnected {
                    wallet: NAME.to_owned(),
                    chain_type: ChainType::Evm,
                },
            )
        })
    }

    fn evm_only(operation: &'static str, chain_type: ChainType) -> Result<(), WalletError> {
        if chain_type == ChainType::Evm {
            return Ok(());
        }
        Err(logged(
            NAME,
            operation,
            WalletError::unsupported(NAME, operation, format!("Safe does not support {}", chain_type.display_name())),
        ))
    }

    fn to_safe_transaction(tx: &UnifiedTransactionRequest) -> Result<SafeTransaction, WalletError> {
        let to = Address::from_str(&tx.to).map_err(|e| WalletError::invalid(NAME, "to", e))?;
        let value = match tx.value.as_deref() {
            Some(value) => parse_ether(value).map_err(|e| WalletError::invalid(NAME, "value", e))?,
            None => Default::default(),
        };
        let data = match tx.data.as_deref() {
            Some(data) => hex::encode_prefixed(hex::decode(data).map_err(|e| WalletError::invalid(NAME, "data", e))?),
            None => "0x".to_owned(),
        };
        Ok(SafeTransaction {
            to: to.to_string(),
            value: value.to_string(),
            data,
        })
    }
}

#[async_trait]
impl UnifiedWalletProvider for SafeWallet {
    fn meta(&self) -> &WalletMeta {
        &self.meta
    }

    fn detected_chains(&self) -> Vec<ChainType> {
        if self.in_safe_frame() {
            vec![ChainType::Evm]
        } else {
            Vec::new()
        }
    }

    fn is_installed(&self) -> bool {
        self.in_safe_frame()
    }

    #[cfg_attr(feature = "telemetry", tracing::instrument(skip(self), err))]
    async fn connect(
        &self,
        chain_type: Option<ChainType>,
    ) -> Result<Vec<UnifiedAccount>, WalletError> {
        if let Some(chain_type) = chain_type {
            Self::evm_only("connect", chain_type)?;
        }
        let not_installed = || {
            logged(
                NAME,
                "connect",
                WalletError::NotInstalled {
                    wallet: NAME.to_owned(),
                },
            )
        };
        if !self.in_safe_frame() {
            return Err(not_installed());
        }
        let loader = self.loader.clone().ok_or_else(not_installed)?;
        let sdk = loader
            .load()
            .await
            .map_err(|source| logged(NAME, "connect", WalletError::from_rpc(NAME, "connect", source)))?;
        let info = sdk
            .safe_info()
            .await
            .map_err(|source| logged(NAME, "connect", WalletError::from_rpc(NAME, "connect", source)))?;
        let account = self.account(&info);
        tracing::info!(safe = %info.safe_address, chain_id = info.chain_id, threshold = info.threshold, "Safe connected");
        *lock(&self.session) = Some(Arc::new(SafeSession { sdk, info }));
        Ok(vec![account])
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        if lock(&self.session).take().is_some() {
            tracing::info!("Safe disconnected");
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
        Ok(lock(&self.session)
            .as_ref()
            .map(|s| vec![self.account(&s.info)])
            .unwrap_or_default())
    }

    async fn switch_chain(
        &self,
        chain_id: ChainRef,
        chain_type: ChainType,
    ) -> Result<(), WalletError> {
        Self::evm_only("switch_chain", chain_type)?;
        let session = self.require_session("switch_chain")?;
        if chain_id.as_evm() == Some(session.info.chain_id) {
            return Ok(());
        }
        Err(logged(
            NAME,
            "switch_chain",
            WalletError::unsupported(
                NAME,
                "switch_chain",
                format!(
                    "this Safe is deployed on {} and cannot switch to {chain_id}",
                    self.networks.chain_name(session.info.chain_id)
                ),
            ),
        ))
    }

    #[cfg_attr(feature = "telemetry", tracing::instrument(skip_all, err))]
    async fn sign_transaction(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        Self::evm_only("sign_transaction", tx.chain_type)?;
        let session = self.require_session("sign_transaction")?;
        if let Some(requested) = tx.chain_id.filter(|id| *id != session.info.chain_id) {
            return Err(logged(
                NAME,
                "sign_transaction",
                WalletError::unsupported(
                    NAME,
                    "sign_transaction",
                    format!(
                        "this Safe is deployed on {} and cannot propose transactions for {}",
                        self.networks.chain_name(session.info.chain_id),
                        self.networks.chain_name(requested)
                    ),
                ),
            ));
        }
        let transaction =
            Self::to_safe_transaction(tx).map_err(|err| logged(NAME, "sign_transaction", err))?;
        tracing::debug!(to = %transaction.to, value = %transaction.value, "Proposing Safe transaction");
        let response = session
            .sdk
            .send_transactions(vec![transaction])
            .await
            .map_err(|source| {
                logged(NAME, "sign_transaction", WalletError::from_rpc(NAME, "sign_transaction", source))
            })?;
        Ok(response.safe_tx_hash)
    }

    async fn sign_message(
        &self,
        _message: &SignableMessage,
        _chain_type: ChainType,
    ) -> Result<String, WalletError> {
        Err(logged(
            NAME,
            "sign_message",
            WalletError::unsupported(NAME, "sign_message", "Safe accounts sign messages on-chain through owner confirmations"),
        ))
    }
}

impl fmt::Debug for SafeWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeWallet")
            .field("allowed_origins", &self.allowed_origins)
            .field("has_loader", &self.loader.is_some())
            .field("safe", &self.safe_info().map(|i| i.safe_address))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::BrowserWindow;
    use crate::testing::MockSafeSdk;

    const SAFE: &str = "0x5afe000000000000000000000000000000000001";

    fn origins() -> Vec<String> {
        vec!["https://app.safe.global".to_owned()]
    }

    fn safe_wallet(window: BrowserWindow, sdk: &Arc<MockSafeSdk>) -> SafeWallet {
        SafeWallet::new(
            Arc::new(BrowserContext::new(window)),
            origins(),
            Some(Arc::clone(sdk) as Arc<dyn SafeSdkLoader>),
            Arc::new(ChainParamsTable::known()),
        )
    }

    fn framed() -> BrowserWindow {
        BrowserWindow::new().framed(Some(vec!["https://app.safe.global".to_owned()]), None)
    }

    #[tokio::test]
    async fn test_outside_frame_never_loads_sdk() {
        let sdk = Arc::new(MockSafeSdk::new(SAFE, 1));
        let wallet = safe_wallet(BrowserWindow::new(), &sdk);
        assert!(!wallet.is_installed());
        let err = wallet.connect(None).await.unwrap_err();
        assert!(matches!(err, WalletError::NotInstalled { .. }));
        assert_eq!(sdk.load_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_returns_safe_account() {
        let sdk = Arc::new(MockSafeSdk::new(SAFE, 137));
        let wallet = safe_wallet(framed(), &sdk);
        let accounts = wallet.connect(Some(ChainType::Evm)).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, SAFE);
        assert_eq!(accounts[0].name, ACCOUNT_NAME);
        assert_eq!(accounts[0].chain_id, ChainRef::Evm(137));
        assert_eq!(accounts[0].chain_name, "Polygon");
        assert_eq!(sdk.load_count(), 1);
        assert_eq!(wallet.get_accounts(None).await.unwrap(), accounts);
    }

    #[tokio::test]
    async fn test_sign_transaction_proposes_batch() {
        let sdk = Arc::new(MockSafeSdk::new(SAFE, 1));
        let wallet = safe_wallet(framed(), &sdk);
        wallet.connect(None).await.unwrap();
        let tx = UnifiedTransactionRequest::evm("0x3535353535353535353535353535353535353535").with_value("0.5");
        let hash = wallet.sign_transaction(&tx).await.unwrap();
        assert_eq!(hash, sdk.safe_tx_hash());
        let sent = sdk.sent();
        assert_eq!(sent, vec![vec![SafeTransaction {
            to: "0x3535353535353535353535353535353535353535".to_owned(),
            value: "500000000000000000".to_owned(),
            data: "0x".to_owned(),
        }]]);
    }

    #[tokio::test]
    async fn test_sign_transaction_for_another_chain_is_refused() {
        let sdk = Arc::new(MockSafeSdk::new(SAFE, 1));
        let wallet = safe_wallet(framed(), &sdk);
        wallet.connect(None).await.unwrap();
        let tx = UnifiedTransactionRequest::evm("0x3535353535353535353535353535353535353535")
            .with_value("1")
            .with_chain_id(137);
        let err = wallet.sign_transaction(&tx).await.unwrap_err();
        match err {
            WalletError::Unsupported { reason, .. } => {
                assert!(reason.contains("Ethereum"), "{reason}");
                assert!(reason.contains("Polygon"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(sdk.sent().is_empty());

        let same_chain = UnifiedTransactionRequest::evm("0x3535353535353535353535353535353535353535").with_chain_id(1);
        wallet.sign_transaction(&same_chain).await.unwrap();
        assert_eq!(sdk.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let sdk = Arc::new(MockSafeSdk::new(SAFE, 1));
        let wallet = safe_wallet(framed(), &sdk);
        wallet.connect(None).await.unwrap();

        let err = wallet.sign_message(&SignableMessage::from("hi"), ChainType::Evm).await.unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { .. }));

        wallet.switch_chain(ChainRef::Evm(1), ChainType::Evm).await.unwrap();
        let err = wallet.switch_chain(ChainRef::Evm(8453), ChainType::Evm).await.unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { .. }));

        let err = wallet.watch(wmux::events::WalletEventHandlers::new(|_| {}, |_| {}, || {})).unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_sdk_failure_is_surfaced() {
        let sdk = Arc::new(MockSafeSdk::new(SAFE, 1).fail_load(ProviderRpcError::new(-32000, "handshake timed out")));
        let wallet = safe_wallet(framed(), &sdk);
        let err = wallet.connect(None).await.unwrap_err();
        assert!(matches!(err, WalletError::Provider { .. }));
        assert!(wallet.get_accounts(None).await.unwrap().is_empty());
    }
}
