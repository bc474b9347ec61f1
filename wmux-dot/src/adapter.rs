//! Polkadot adapter over an injected extension.
//!
//! Relay-chain selection is fixed at construction; extensions have no
//! network switch, so the adapter keeps the trait's unsupported defaults for
//! `switch_chain` and the multi-chain wallet treats that as a no-op.

use alloy_primitives::hex;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wmux::account::account_label;
use wmux::{
    ChainType, SecondaryChainAdapter, SignableMessage, UnifiedAccount, UnifiedTransactionRequest,
    WalletError,
};

use crate::extension::{
    InjectedAccount, InjectedApi, PolkadotExtension, PolkadotSigner, RawPayloadKind,
    SignerPayloadRaw,
};
use crate::networks::{PolkadotNetwork, is_ss58_address};

#[derive(Debug, Clone)]
struct PolkadotSession {
    api: Arc<dyn InjectedApi>,
    addresses: Vec<String>,
}

/// Adapter for one injected Polkadot extension.
#[derive(Debug)]
pub struct PolkadotAdapter {
    wallet: String,
    app_name: String,
    network: PolkadotNetwork,
    extension: Arc<dyn PolkadotExtension>,
    session: Mutex<Option<PolkadotSession>>,
}

impl PolkadotAdapter {
    /// Creates an adapter that enables `extension` as `app_name`.
    pub fn new(
        wallet: impl Into<String>,
        extension: Arc<dyn PolkadotExtension>,
        app_name: impl Into<String>,
        network: PolkadotNetwork,
    ) -> Self {
        Self {
            wallet: wallet.into(),
            app_name: app_name.into(),
            network,
            extension,
            session: Mutex::new(None),
        }
    }

    /// Returns the network accounts are reported on.
    #[must_use]
    pub const fn network(&self) -> PolkadotNetwork {
        self.network
    }

    /// Returns `true` once `connect` has succeeded.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session().is_some()
    }

    fn session(&self) -> MutexGuard<'_, Option<PolkadotSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail(&self, operation: &'static str, err: WalletError) -> WalletError {
        tracing::warn!(wallet = %self.wallet, operation, error = %err, "Polkadot adapter operation failed");
        err
    }

    /// Enables the extension and returns the accounts usable on the network.
    ///
    /// # Errors
    ///
    /// The extension's rejection, or [`WalletError::NoAccounts`] when no
    /// valid account remains after network filtering.
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip(self), fields(wallet = %self.wallet), err))]
    pub async fn connect(&self) -> Result<Vec<UnifiedAccount>, WalletError> {
        let api = self
            .extension
            .enable(&self.app_name)
            .await
            .map_err(|source| {
                self.fail("connect", WalletError::from_rpc(self.wallet.as_str(), "connect", source))
            })?;
        let accounts = self.list_accounts(api.as_ref(), "connect").await?;
        if accounts.is_empty() {
            return Err(self.fail(
                "connect",
                WalletError::NoAccounts {
                    wallet: self.wallet.clone(),
                    chain_type: ChainType::Polkadot,
                },
            ));
        }
        *self.session() = Some(PolkadotSession {
            api,
            addresses: accounts.iter().map(|a| a.address.clone()).collect(),
        });
        tracing::info!(wallet = %self.wallet, network = %self.network, accounts = accounts.len(), "Polkadot extension connected");
        Ok(self.to_unified(&accounts))
    }

    async fn list_accounts(
        &self,
        api: &dyn InjectedApi,
        operation: &'static str,
    ) -> Result<Vec<InjectedAccount>, WalletError> {
        let accounts = api.accounts().await.map_err(|source| {
            self.fail(operation, WalletError::from_rpc(self.wallet.as_str(), operation, source))
        })?;
        Ok(accounts
            .into_iter()
            .filter(|a| self.network.accepts(a.genesis_hash.as_deref()))
            .filter(|a| {
                let valid = is_ss58_address(&a.address);
                if !valid {
                    tracing::warn!(wallet = %self.wallet, address = %a.address, "Skipping non-SS58 account");
                }
                valid
            })
            .collect())
    }

    /// Re-reads the extension's account list.
    ///
    /// # Errors
    ///
    /// [`WalletError::NotConnected`] before `connect`, or the extension's error.
    pub async fn accounts(&self) -> Result<Vec<UnifiedAccount>, WalletError> {
        let session = self.require_session("get_accounts")?;
        let accounts = self.list_accounts(session.api.as_ref(), "get_accounts").await?;
        if let Some(current) = self.session().as_mut() {
            current.addresses = accounts.iter().map(|a| a.address.clone()).collect();
        }
        Ok(self.to_unified(&accounts))
    }

    /// Signs a hex-encoded extrinsic payload with `signRaw{type: payload}`.
    ///
    /// The signing account is `tx.to` when set, otherwise the first
    /// connected account.
    ///
    /// # Errors
    ///
    /// [`WalletError::TypeMismatch`], [`WalletError::NotConnected`],
    /// [`WalletError::InvalidInput`], [`WalletError::Unsupported`] when the
    /// extension exposes no signer, or the extension's failure.
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip_all, fields(wallet = %self.wallet), err))]
    pub async fn sign_payload(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        tx.ensure_chain_type(ChainType::Polkadot)
            .map_err(|e| self.fail("sign_transaction", e))?;
        let session = self.require_session("sign_transaction")?;
        let data = tx.data.as_deref().unwrap_or_default();
        let bytes = hex::decode(data)
            .ok()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                self.fail(
                    "sign_transaction",
                    WalletError::invalid(self.wallet.as_str(), "data", "expected a 0x-hex signing payload"),
                )
            })?;
        let address = if tx.to.is_empty() {
            session.addresses.first().cloned().unwrap_or_default()
        } else if is_ss58_address(&tx.to) {
            tx.to.clone()
        } else {
            return Err(self.fail(
                "sign_transaction",
                WalletError::invalid(self.wallet.as_str(), "to", format!("{} is not an SS58 address", tx.to)),
            ));
        };
        self.sign_raw(&session, "sign_transaction", SignerPayloadRaw {
            address,
            data: hex::encode_prefixed(bytes),
            kind: RawPayloadKind::Payload,
        })
        .await
    }

    /// Signs a message with `signRaw{type: bytes}` from the first account.
    ///
    /// # Errors
    ///
    /// [`WalletError::NotConnected`], [`WalletError::Unsupported`] when the
    /// extension exposes no signer, or the extension's failure.
    pub async fn sign_bytes(&self, message: &SignableMessage) -> Result<String, WalletError> {
        let session = self.require_session("sign_message")?;
        let address = session.addresses.first().cloned().unwrap_or_default();
        self.sign_raw(&session, "sign_message", SignerPayloadRaw {
            address,
            data: hex::encode_prefixed(message.as_bytes()),
            kind: RawPayloadKind::Bytes,
        })
        .await
    }

    async fn sign_raw(
        &self,
        session: &PolkadotSession,
        operation: &'static str,
        payload: SignerPayloadRaw,
    ) -> Result<String, WalletError> {
        let signer: Arc<dyn PolkadotSigner> = session.api.signer().ok_or_else(|| {
            self.fail(
                operation,
                WalletError::unsupported(self.wallet.as_str(), operation, "the extension exposes no signer"),
            )
        })?;
        tracing::debug!(wallet = %self.wallet, address = %payload.address, kind = ?payload.kind, "Requesting signRaw");
        let result = signer.sign_raw(payload).await.map_err(|source| {
            self.fail(operation, WalletError::from_rpc(self.wallet.as_str(), operation, source))
        })?;
        Ok(result.signature)
    }

    /// Forgets the injected API. Extensions have no revoke call.
    pub fn close(&self) {
        if self.session().take().is_some() {
            tracing::info!(wallet = %self.wallet, "Polkadot extension disconnected");
        }
    }

    fn require_session(&self, operation: &'static str) -> Result<PolkadotSession, WalletError> {
        let session = self.session().clone();
        session.ok_or_else(|| {
            self.fail(
                operation,
                WalletError::NotConnected {
                    wallet: self.wallet.clone(),
                    chain_type: ChainType::Polkadot,
                },
            )
        })
    }

    fn to_unified(&self, accounts: &[InjectedAccount]) -> Vec<UnifiedAccount> {
        accounts
            .iter()
            .enumerate()
            .map(|(index, account)| {
                let name = account
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| account_label(index));
                UnifiedAccount::new(
                    account.address.as_str(),
                    ChainType::Polkadot,
                    self.network.chain_ref(),
                    self.network.display_name(),
                    self.wallet.as_str(),
                    name,
                )
            })
            .collect()
    }
}

#[async_trait]
impl SecondaryChainAdapter for PolkadotAdapter {
    fn chain_type(&self) -> ChainType {
        ChainType::Polkadot
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.close();
        Ok(())
    }

    async fn get_accounts(&self) -> Result<Vec<UnifiedAccount>, WalletError> {
        self.accounts().await
    }

    async fn sign_transaction(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        self.sign_payload(tx).await
    }

    async fn sign_message(&self, message: &SignableMessage) -> Result<String, WalletError> {
        self.sign_bytes(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPolkadotExtension;
    use wmux::{ChainRef, ProviderRpcError};

    const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
    const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";

    fn adapter(mock: &Arc<MockPolkadotExtension>) -> PolkadotAdapter {
        PolkadotAdapter::new(
            "Talisman",
            Arc::clone(mock) as Arc<dyn PolkadotExtension>,
            "wmux-tests",
            PolkadotNetwork::Polkadot,
        )
    }

    #[tokio::test]
    async fn test_connect_filters_by_genesis_hash() {
        let mock = Arc::new(
            MockPolkadotExtension::new()
                .with_account(InjectedAccount::new(ALICE).with_name("Alice"))
                .with_account(
                    InjectedAccount::new(BOB)
                        .with_genesis_hash(PolkadotNetwork::Kusama.genesis_hash()),
                )
                .with_account(InjectedAccount::new("0xnot-ss58")),
        );
        let accounts = adapter(&mock).connect().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, ALICE);
        assert_eq!(accounts[0].name, "Alice");
        assert_eq!(accounts[0].chain_type, ChainType::Polkadot);
        assert_eq!(
            accounts[0].chain_id,
            ChainRef::named(PolkadotNetwork::Polkadot.genesis_hash())
        );
        assert_eq!(mock.enabled_with(), vec!["wmux-tests".to_owned()]);
    }

    #[tokio::test]
    async fn test_connect_without_usable_accounts() {
        let mock = Arc::new(MockPolkadotExtension::new().with_account(
            InjectedAccount::new(BOB).with_genesis_hash(PolkadotNetwork::Westend.genesis_hash()),
        ));
        let err = adapter(&mock).connect().await.unwrap_err();
        assert!(matches!(err, WalletError::NoAccounts { chain_type: ChainType::Polkadot, .. }));
    }

    #[tokio::test]
    async fn test_enable_rejection() {
        let mock = Arc::new(
            MockPolkadotExtension::new()
                .with_account(InjectedAccount::new(ALICE))
                .fail_enable(ProviderRpcError::user_rejected("Rejected")),
        );
        assert!(adapter(&mock).connect().await.unwrap_err().is_user_rejected());
    }

    #[tokio::test]
    async fn test_unnamed_accounts_get_positional_labels() {
        let mock = Arc::new(
            MockPolkadotExtension::new()
                .with_account(InjectedAccount::new(ALICE))
                .with_account(InjectedAccount::new(BOB)),
        );
        let accounts = adapter(&mock).connect().await.unwrap();
        assert_eq!(accounts[0].name, "Primary Account");
        assert_eq!(accounts[1].name, "Account 2");
    }

    #[tokio::test]
    async fn test_sign_transaction_uses_payload_kind() {
        let mock = Arc::new(
            MockPolkadotExtension::new()
                .with_account(InjectedAccount::new(ALICE))
                .with_account(InjectedAccount::new(BOB)),
        );
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        let signature = adapter
            .sign_transaction(&UnifiedTransactionRequest::polkadot(BOB, "0x0a0b"))
            .await
            .unwrap();
        assert_eq!(signature, mock.signature());

        let signed = mock.sign_requests();
        assert_eq!(signed[0].address, BOB);
        assert_eq!(signed[0].data, "0x0a0b");
        assert_eq!(signed[0].kind, RawPayloadKind::Payload);
    }

    #[tokio::test]
    async fn test_sign_transaction_defaults_to_first_account() {
        let mock = Arc::new(MockPolkadotExtension::new().with_account(InjectedAccount::new(ALICE)));
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        adapter
            .sign_transaction(&UnifiedTransactionRequest::polkadot("", "0x01"))
            .await
            .unwrap();
        assert_eq!(mock.sign_requests()[0].address, ALICE);
    }

    #[tokio::test]
    async fn test_sign_transaction_type_mismatch() {
        let mock = Arc::new(MockPolkadotExtension::new().with_account(InjectedAccount::new(ALICE)));
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        let err = adapter
            .sign_transaction(&UnifiedTransactionRequest::solana("AQID"))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::TypeMismatch { .. }));
        assert!(mock.sign_requests().is_empty());
    }

    #[tokio::test]
    async fn test_sign_message_hex_encodes_text() {
        let mock = Arc::new(MockPolkadotExtension::new().with_account(InjectedAccount::new(ALICE)));
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        adapter.sign_message(&"hi".into()).await.unwrap();
        let signed = mock.sign_requests();
        assert_eq!(signed[0].data, "0x6869");
        assert_eq!(signed[0].kind, RawPayloadKind::Bytes);
    }

    #[tokio::test]
    async fn test_missing_signer_is_unsupported() {
        let mock = Arc::new(
            MockPolkadotExtension::new()
                .with_account(InjectedAccount::new(ALICE))
                .without_signer(),
        );
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        let err = adapter.sign_message(&"hi".into()).await.unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_chain_switch_is_not_offered() {
        let mock = Arc::new(MockPolkadotExtension::new());
        let adapter = adapter(&mock);
        assert!(!adapter.supports_chain_switch());
        assert!(!adapter.supports_cluster_switch());
    }

    #[tokio::test]
    async fn test_disconnect_then_requires_reconnect() {
        let mock = Arc::new(MockPolkadotExtension::new().with_account(InjectedAccount::new(ALICE)));
        let adapter = adapter(&mock);
        adapter.disconnect().await.unwrap();
        adapter.connect().await.unwrap();
        adapter.disconnect().await.unwrap();
        assert!(matches!(
            adapter.get_accounts().await.unwrap_err(),
            WalletError::NotConnected { .. }
        ));
    }
}
