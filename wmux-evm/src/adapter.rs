//! EVM chain adapter over an EIP-1193 provider.
//!
//! [`EvmAdapter`] turns the raw `request`/`on`/`removeListener` surface into
//! connect, chain-switch and signing operations producing unified types.
//!
//! # Chain switching
//!
//! `wallet_switchEthereumChain` fails with 4902 when the wallet has never seen
//! the chain. The adapter then adds it from [`ChainParamsTable`] with
//! `wallet_addEthereumChain` and retries the switch exactly once.

use alloy_primitives::utils::parse_ether;
use alloy_primitives::{Address, B256, hex};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use wmux::account::account_label;
use wmux::events::{EventSubscription, WalletEventHandlers};
use wmux::{
    ChainRef, ChainType, ProviderRpcError, SecondaryChainAdapter, SignableMessage, UnifiedAccount,
    UnifiedTransactionRequest, WalletError,
};

use crate::networks::ChainParamsTable;
use crate::provider::{Eip1193Provider, ProviderEvent, parse_accounts, parse_quantity};

/// The account an adapter signs with: the first account the wallet returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmSigner {
    address: Address,
}

impl EvmSigner {
    /// Returns the signer address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }
}

#[derive(Debug, Default)]
struct EvmSession {
    signer: Option<EvmSigner>,
    chain_id: Option<u64>,
}

/// Adapter for one EIP-1193 provider object.
#[derive(Debug)]
pub struct EvmAdapter {
    wallet: String,
    provider: Arc<dyn Eip1193Provider>,
    networks: Arc<ChainParamsTable>,
    session: Mutex<EvmSession>,
}

impl EvmAdapter {
    /// Creates an adapter for `provider` on behalf of `wallet`.
    pub fn new(
        wallet: impl Into<String>,
        provider: Arc<dyn Eip1193Provider>,
        networks: Arc<ChainParamsTable>,
    ) -> Self {
        Self {
            wallet: wallet.into(),
            provider,
            networks,
            session: Mutex::new(EvmSession::default()),
        }
    }

    /// Returns the wrapped provider object.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn Eip1193Provider> {
        &self.provider
    }

    /// Returns the chain parameter table.
    #[must_use]
    pub fn networks(&self) -> &ChainParamsTable {
        &self.networks
    }

    /// Returns the signer bound on connect, if connected.
    #[must_use]
    pub fn signer(&self) -> Option<EvmSigner> {
        self.session().signer
    }

    /// Returns the last chain id observed.
    #[must_use]
    pub fn current_chain_id(&self) -> Option<u64> {
        self.session().chain_id
    }

    /// Returns `true` once `connect` has succeeded.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.signer().is_some()
    }

    fn session(&self) -> std::sync::MutexGuard<'_, EvmSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends a request and maps wallet failures, logging them first.
    async fn call(
        &self,
        operation: &'static str,
        method: &str,
        params: Value,
    ) -> Result<Value, WalletError> {
        self.provider
            .request(method, params)
            .await
            .map_err(|source| {
                let err = WalletError::from_rpc(self.wallet.as_str(), operation, source);
                tracing::warn!(wallet = %self.wallet, operation, method, error = %err, "EVM request failed");
                err
            })
    }

    fn fail(&self, operation: &'static str, err: WalletError) -> WalletError {
        tracing::warn!(wallet = %self.wallet, operation, error = %err, "EVM adapter operation failed");
        err
    }

    /// Requests account access and binds a signer to the first account.
    ///
    /// If `target_chain_id` differs from the live network the adapter switches
    /// and re-reads the network, since switching changes the wallet's state.
    ///
    /// # Errors
    ///
    /// [`WalletError::NoAccounts`] if the wallet returns an empty list, or any
    /// failure from the permission request or chain switch.
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip(self), fields(wallet = %self.wallet), err))]
    pub async fn connect(
        &self,
        target_chain_id: Option<u64>,
    ) -> Result<Vec<UnifiedAccount>, WalletError> {
        let raw = self.call("connect", "eth_requestAccounts", json!([])).await?;
        let accounts = parse_accounts(&raw).unwrap_or_default();
        let Some(first) = accounts.first() else {
            return Err(self.fail(
                "connect",
                WalletError::NoAccounts {
                    wallet: self.wallet.clone(),
                    chain_type: ChainType::Evm,
                },
            ));
        };
        let address = Address::from_str(first)
            .map_err(|e| self.fail("connect", WalletError::invalid(self.wallet.as_str(), "account", e)))?;

        let mut chain_id = self.fetch_chain_id("connect").await?;
        if let Some(target) = target_chain_id.filter(|target| *target != chain_id) {
            self.switch_chain(target).await?;
            chain_id = self.fetch_chain_id("connect").await?;
        }

        {
            let mut session = self.session();
            session.signer = Some(EvmSigner { address });
            session.chain_id = Some(chain_id);
        }
        tracing::info!(wallet = %self.wallet, chain_id, accounts = accounts.len(), "EVM wallet connected");
        Ok(self.to_unified(&accounts, chain_id))
    }

    /// Forgets the signer and chain. EIP-1193 has no disconnect call; the
    /// wallet keeps its permission grant.
    pub fn disconnect(&self) {
        let mut session = self.session();
        if session.signer.take().is_some() {
            tracing::info!(wallet = %self.wallet, "EVM wallet disconnected");
        }
        session.chain_id = None;
    }

    /// Returns the wallet's current accounts on the live network.
    ///
    /// # Errors
    ///
    /// [`WalletError::NotConnected`] before `connect`, or a wallet failure.
    pub async fn get_accounts(&self) -> Result<Vec<UnifiedAccount>, WalletError> {
        self.require_signer("get_accounts")?;
        let raw = self.call("get_accounts", "eth_accounts", json!([])).await?;
        let accounts = parse_accounts(&raw).unwrap_or_default();
        let chain_id = self.fetch_chain_id("get_accounts").await?;
        self.session().chain_id = Some(chain_id);
        Ok(self.to_unified(&accounts, chain_id))
    }

    /// Reads `eth_chainId`.
    ///
    /// # Errors
    ///
    /// Returns a wallet failure or [`WalletError::InvalidInput`] for an
    /// unparsable answer.
    pub async fn chain_id(&self) -> Result<u64, WalletError> {
        self.fetch_chain_id("chain_id").await
    }

    async fn fetch_chain_id(&self, operation: &'static str) -> Result<u64, WalletError> {
        let raw = self.call(operation, "eth_chainId", json!([])).await?;
        parse_quantity(&raw).ok_or_else(|| {
            self.fail(
                operation,
                WalletError::invalid(self.wallet.as_str(), "chainId", format!("unparsable {raw}")),
            )
        })
    }

    /// Switches the wallet to `chain_id`, adding the chain first if the
    /// wallet does not know it.
    ///
    /// # Errors
    ///
    /// - [`WalletError::UserRejected`] naming the target chain on 4001
    /// - [`WalletError::ChainNotAdded`] if the chain is unknown here too
    /// - [`WalletError::Provider`] with the wallet's error otherwise
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip(self), fields(wallet = %self.wallet), err))]
    pub async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        match self.request_switch(chain_id).await {
            Ok(()) => {}
            Err(err) if err.is_chain_not_added() => {
                let Some(params) = self.networks.get(chain_id) else {
                    return Err(self.fail(
                        "switch_chain",
                        WalletError::ChainNotAdded {
                            wallet: self.wallet.clone(),
                            chain_id,
                        },
                    ));
                };
                tracing::info!(wallet = %self.wallet, chain_id, chain = %params.chain_name, "Adding chain to wallet");
                let params = serde_json::to_value(params).map_err(|e| {
                    self.fail("add_chain", WalletError::invalid(self.wallet.as_str(), "chain parameters", e))
                })?;
                self.provider
                    .request("wallet_addEthereumChain", json!([params]))
                    .await
                    .map_err(|err| self.chain_error("add_chain", chain_id, err))?;
                self.request_switch(chain_id)
                    .await
                    .map_err(|err| self.chain_error("switch_chain", chain_id, err))?;
            }
            Err(err) => return Err(self.chain_error("switch_chain", chain_id, err)),
        }
        self.session().chain_id = Some(chain_id);
        tracing::info!(wallet = %self.wallet, chain_id, "Switched EVM chain");
        Ok(())
    }

    async fn request_switch(&self, chain_id: u64) -> Result<(), ProviderRpcError> {
        self.provider
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": format!("{chain_id:#x}") }]),
            )
            .await
            .map(drop)
    }

    /// Maps a failed switch or add request, naming the target chain on 4001.
    fn chain_error(&self, operation: &'static str, chain_id: u64, source: ProviderRpcError) -> WalletError {
        let err = if source.is_user_rejected() {
            let verb = if operation == "add_chain" { "Adding" } else { "Switching to" };
            WalletError::UserRejected {
                wallet: self.wallet.clone(),
                operation,
                message: format!(
                    "{verb} {} was rejected in {}",
                    self.networks.chain_name(chain_id),
                    self.wallet
                ),
            }
        } else {
            WalletError::Provider {
                wallet: self.wallet.clone(),
                operation,
                source,
            }
        };
        self.fail(operation, err)
    }

    /// Submits a transaction through the wallet and returns its hash without
    /// waiting for confirmation.
    ///
    /// # Errors
    ///
    /// [`WalletError::TypeMismatch`] for non-EVM requests (nothing is sent),
    /// [`WalletError::NotConnected`], [`WalletError::InvalidInput`] for bad
    /// fields, or the wallet's failure.
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip_all, fields(wallet = %self.wallet), err))]
    pub async fn sign_transaction(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        tx.ensure_chain_type(ChainType::Evm)
            .map_err(|e| self.fail("sign_transaction", e))?;
        let signer = self.require_signer("sign_transaction")?;
        let request = self.build_transaction(signer, tx)?;
        tracing::debug!(wallet = %self.wallet, to = %tx.to, "Submitting EVM transaction");
        let raw = self
            .call("sign_transaction", "eth_sendTransaction", json!([request]))
            .await?;
        let hash = raw
            .as_str()
            .and_then(|s| B256::from_str(s).ok())
            .ok_or_else(|| {
                self.fail(
                    "sign_transaction",
                    WalletError::invalid(self.wallet.as_str(), "transaction hash", format!("unexpected {raw}")),
                )
            })?;
        Ok(hash.to_string())
    }

    fn build_transaction(
        &self,
        signer: EvmSigner,
        tx: &UnifiedTransactionRequest,
    ) -> Result<Value, WalletError> {
        let invalid = |field: &'static str, reason: String| {
            self.fail("sign_transaction", WalletError::invalid(self.wallet.as_str(), field, reason))
        };
        let to = Address::from_str(&tx.to).map_err(|e| invalid("to", e.to_string()))?;

        let mut request = Map::new();
        request.insert("from".into(), json!(signer.address.to_string()));
        request.insert("to".into(), json!(to.to_string()));
        if let Some(value) = tx.value.as_deref() {
            let wei = parse_ether(value).map_err(|e| invalid("value", e.to_string()))?;
            request.insert("value".into(), json!(format!("{wei:#x}")));
        }
        if let Some(data) = tx.data.as_deref() {
            let bytes = hex::decode(data).map_err(|e| invalid("data", e.to_string()))?;
            request.insert("data".into(), json!(hex::encode_prefixed(bytes)));
        }
        if let Some(gas_limit) = tx.gas_limit {
            request.insert("gas".into(), json!(format!("{gas_limit:#x}")));
        }
        if let Some(gas_price) = tx.gas_price {
            request.insert("gasPrice".into(), json!(format!("{gas_price:#x}")));
        }
        if let Some(chain_id) = tx.chain_id {
            request.insert("chainId".into(), json!(format!("{chain_id:#x}")));
        }
        Ok(Value::Object(request))
    }

    /// Signs a message with `personal_sign`. Byte messages are hex-encoded
    /// because wallets expect a string payload.
    ///
    /// # Errors
    ///
    /// [`WalletError::NotConnected`] or the wallet's failure.
    pub async fn sign_message(&self, message: &SignableMessage) -> Result<String, WalletError> {
        let signer = self.require_signer("sign_message")?;
        let payload = match message {
            SignableMessage::Text(text) => text.clone(),
            SignableMessage::Bytes(bytes) => hex::encode_prefixed(bytes),
        };
        let raw = self
            .call(
                "sign_message",
                "personal_sign",
                json!([payload, signer.address.to_string()]),
            )
            .await?;
        raw.as_str().map(ToOwned::to_owned).ok_or_else(|| {
            self.fail(
                "sign_message",
                WalletError::invalid(self.wallet.as_str(), "signature", format!("unexpected {raw}")),
            )
        })
    }

    /// Subscribes to `accountsChanged`, `chainChanged` and `disconnect`.
    ///
    /// The returned subscription removes all three listeners when
    /// unsubscribed or dropped; the provider object is shared with the rest
    /// of the page, so listeners must not outlive the session.
    pub fn setup_event_listeners(&self, handlers: &WalletEventHandlers) -> EventSubscription {
        let on_accounts = Arc::clone(&handlers.on_accounts_changed);
        let accounts_id = self.provider.on(
            ProviderEvent::AccountsChanged,
            Arc::new(move |payload: &Value| on_accounts(parse_accounts(payload).unwrap_or_default())),
        );

        let on_chain = Arc::clone(&handlers.on_chain_changed);
        let wallet = self.wallet.clone();
        let chain_id = self.provider.on(
            ProviderEvent::ChainChanged,
            Arc::new(move |payload: &Value| match parse_quantity(payload) {
                Some(id) => on_chain(id),
                None => tracing::warn!(wallet = %wallet, %payload, "Ignoring unparsable chainChanged"),
            }),
        );

        let on_disconnect = Arc::clone(&handlers.on_disconnect);
        let disconnect_id = self.provider.on(
            ProviderEvent::Disconnect,
            Arc::new(move |_: &Value| on_disconnect()),
        );

        let provider = Arc::clone(&self.provider);
        EventSubscription::new(move || {
            provider.remove_listener(ProviderEvent::AccountsChanged, accounts_id);
            provider.remove_listener(ProviderEvent::ChainChanged, chain_id);
            provider.remove_listener(ProviderEvent::Disconnect, disconnect_id);
        })
    }

    fn require_signer(&self, operation: &'static str) -> Result<EvmSigner, WalletError> {
        self.signer().ok_or_else(|| {
            self.fail(
                operation,
                WalletError::NotConnected {
                    wallet: self.wallet.clone(),
                    chain_type: ChainType::Evm,
                },
            )
        })
    }

    fn to_unified(&self, accounts: &[String], chain_id: u64) -> Vec<UnifiedAccount> {
        let chain_name = self.networks.chain_name(chain_id);
        accounts
            .iter()
            .enumerate()
            .map(|(index, address)| {
                UnifiedAccount::new(
                    address.as_str(),
                    ChainType::Evm,
                    ChainRef::Evm(chain_id),
                    chain_name.as_str(),
                    self.wallet.as_str(),
                    account_label(index),
                )
            })
            .collect()
    }
}

#[async_trait]
impl SecondaryChainAdapter for EvmAdapter {
    fn chain_type(&self) -> ChainType {
        ChainType::Evm
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        Self::disconnect(self);
        Ok(())
    }

    async fn get_accounts(&self) -> Result<Vec<UnifiedAccount>, WalletError> {
        Self::get_accounts(self).await
    }

    async fn sign_transaction(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        Self::sign_transaction(self, tx).await
    }

    async fn sign_message(&self, message: &SignableMessage) -> Result<String, WalletError> {
        Self::sign_message(self, message).await
    }

    fn supports_chain_switch(&self) -> bool {
        true
    }

    async fn switch_chain(&self, chain_id: &ChainRef) -> Result<(), WalletError> {
        match chain_id.as_evm() {
            Some(id) => Self::switch_chain(self, id).await,
            None => Err(self.fail(
                "switch_chain",
                WalletError::invalid(self.wallet.as_str(), "chain_id", format!("{chain_id} is not an EVM chain id")),
            )),
        }
    }
}
