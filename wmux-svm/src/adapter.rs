//! Solana adapter over an injected wallet-standard object.
//!
//! Wallets do not expose cluster selection, so the active cluster is local
//! state: it tags the returned accounts and is what `switch_cluster` changes.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use solana_pubkey::Pubkey;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wmux::account::account_label;
use wmux::{
    ChainType, SecondaryChainAdapter, SignableMessage, UnifiedAccount, UnifiedTransactionRequest,
    WalletError,
};

use crate::networks::SolanaCluster;
use crate::wallet::SolanaWallet;

const SIGNATURE_LEN: usize = 64;

#[derive(Debug)]
struct SolanaSession {
    cluster: SolanaCluster,
    public_key: Option<Pubkey>,
}

/// Adapter for one injected Solana wallet.
#[derive(Debug)]
pub struct SolanaAdapter {
    wallet: String,
    inner: Arc<dyn SolanaWallet>,
    session: Mutex<SolanaSession>,
}

/// Decodes a base58 public key, rejecting anything that is not 32 bytes.
#[must_use]
pub fn parse_pubkey(value: &str) -> Option<Pubkey> {
    let bytes = bs58::decode(value.trim()).into_vec().ok()?;
    let bytes: [u8; 32] = bytes.as_slice().try_into().ok()?;
    Some(Pubkey::new_from_array(bytes))
}

impl SolanaAdapter {
    /// Creates an adapter on `cluster`.
    pub fn new(
        wallet: impl Into<String>,
        inner: Arc<dyn SolanaWallet>,
        cluster: SolanaCluster,
    ) -> Self {
        Self {
            wallet: wallet.into(),
            inner,
            session: Mutex::new(SolanaSession {
                cluster,
                public_key: None,
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, SolanaSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail(&self, operation: &'static str, err: WalletError) -> WalletError {
        tracing::warn!(wallet = %self.wallet, operation, error = %err, "Solana adapter operation failed");
        err
    }

    /// Returns the active cluster.
    #[must_use]
    pub fn cluster(&self) -> SolanaCluster {
        self.session().cluster
    }

    /// Returns the connected public key.
    #[must_use]
    pub fn public_key(&self) -> Option<Pubkey> {
        self.session().public_key
    }

    /// Connects the wallet and returns its single account.
    ///
    /// # Errors
    ///
    /// The wallet's rejection, or [`WalletError::InvalidInput`] when the
    /// returned key is not a 32-byte base58 string.
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip(self), fields(wallet = %self.wallet), err))]
    pub async fn connect(&self) -> Result<Vec<UnifiedAccount>, WalletError> {
        let raw = self.inner.connect().await.map_err(|source| {
            self.fail("connect", WalletError::from_rpc(self.wallet.as_str(), "connect", source))
        })?;
        let key = parse_pubkey(&raw).ok_or_else(|| {
            self.fail(
                "connect",
                WalletError::invalid(self.wallet.as_str(), "public key", format!("{raw} is not a Solana address")),
            )
        })?;
        let cluster = {
            let mut session = self.session();
            session.public_key = Some(key);
            session.cluster
        };
        tracing::info!(wallet = %self.wallet, %cluster, "Solana wallet connected");
        Ok(vec![self.account(key, cluster)])
    }

    /// Returns the connected account.
    ///
    /// # Errors
    ///
    /// [`WalletError::NotConnected`] before `connect`.
    pub fn accounts(&self) -> Result<Vec<UnifiedAccount>, WalletError> {
        let (key, cluster) = self.require_key("get_accounts")?;
        Ok(vec![self.account(key, cluster)])
    }

    /// Selects the cluster accounts are reported on.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unsupported`] for an unknown cluster name.
    pub fn select_cluster(&self, name: &str) -> Result<(), WalletError> {
        let cluster: SolanaCluster = name.parse().map_err(|e| {
            self.fail(
                "switch_cluster",
                WalletError::unsupported(self.wallet.as_str(), "switch_cluster", format!("{e}")),
            )
        })?;
        self.session().cluster = cluster;
        tracing::info!(wallet = %self.wallet, %cluster, "Switched Solana cluster");
        Ok(())
    }

    /// Signs and sends a base64 serialized transaction, returning the
    /// base58 signature.
    ///
    /// # Errors
    ///
    /// [`WalletError::TypeMismatch`], [`WalletError::NotConnected`],
    /// [`WalletError::InvalidInput`] for missing or malformed data, or the
    /// wallet's failure.
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip_all, fields(wallet = %self.wallet), err))]
    pub async fn send_transaction(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        tx.ensure_chain_type(ChainType::Solana)
            .map_err(|e| self.fail("sign_transaction", e))?;
        self.require_key("sign_transaction")?;
        let encoded = tx.data.as_deref().ok_or_else(|| {
            self.fail(
                "sign_transaction",
                WalletError::invalid(self.wallet.as_str(), "data", "a serialized transaction is required"),
            )
        })?;
        let bytes = BASE64.decode(encoded.trim()).map_err(|e| {
            self.fail("sign_transaction", WalletError::invalid(self.wallet.as_str(), "data", e))
        })?;
        tracing::debug!(wallet = %self.wallet, bytes = bytes.len(), "Submitting Solana transaction");
        let signature = self
            .inner
            .sign_and_send_transaction(&bytes)
            .await
            .map_err(|source| {
                self.fail(
                    "sign_transaction",
                    WalletError::from_rpc(self.wallet.as_str(), "sign_transaction", source),
                )
            })?;
        let decoded_len = bs58::decode(&signature).into_vec().map_or(0, |b| b.len());
        if decoded_len != SIGNATURE_LEN {
            return Err(self.fail(
                "sign_transaction",
                WalletError::invalid(self.wallet.as_str(), "signature", format!("unexpected {signature}")),
            ));
        }
        Ok(signature)
    }

    /// Signs a message and returns the base58 signature.
    ///
    /// # Errors
    ///
    /// [`WalletError::NotConnected`] or the wallet's failure.
    pub async fn sign(&self, message: &SignableMessage) -> Result<String, WalletError> {
        self.require_key("sign_message")?;
        let signature = self
            .inner
            .sign_message(message.as_bytes())
            .await
            .map_err(|source| {
                self.fail("sign_message", WalletError::from_rpc(self.wallet.as_str(), "sign_message", source))
            })?;
        Ok(bs58::encode(signature).into_string())
    }

    /// Ends the session. A never-connected adapter does not contact the wallet.
    ///
    /// # Errors
    ///
    /// The wallet's failure to disconnect; local state is cleared regardless.
    pub async fn close(&self) -> Result<(), WalletError> {
        let was_connected = self.session().public_key.take().is_some();
        if !was_connected {
            return Ok(());
        }
        self.inner.disconnect().await.map_err(|source| {
            self.fail("disconnect", WalletError::from_rpc(self.wallet.as_str(), "disconnect", source))
        })?;
        tracing::info!(wallet = %self.wallet, "Solana wallet disconnected");
        Ok(())
    }

    fn require_key(&self, operation: &'static str) -> Result<(Pubkey, SolanaCluster), WalletError> {
        let session = self.session();
        match session.public_key {
            Some(key) => Ok((key, session.cluster)),
            None => {
                drop(session);
                Err(self.fail(
                    operation,
                    WalletError::NotConnected {
                        wallet: self.wallet.clone(),
                        chain_type: ChainType::Solana,
                    },
                ))
            }
        }
    }

    fn account(&self, key: Pubkey, cluster: SolanaCluster) -> UnifiedAccount {
        UnifiedAccount::new(
            key.to_string(),
            ChainType::Solana,
            cluster.chain_ref(),
            cluster.display_name(),
            self.wallet.as_str(),
            account_label(0),
        )
    }
}

#[async_trait]
impl SecondaryChainAdapter for SolanaAdapter {
    fn chain_type(&self) -> ChainType {
        ChainType::Solana
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.close().await
    }

    async fn get_accounts(&self) -> Result<Vec<UnifiedAccount>, WalletError> {
        self.accounts()
    }

    async fn sign_transaction(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        self.send_transaction(tx).await
    }

    async fn sign_message(&self, message: &SignableMessage) -> Result<String, WalletError> {
        self.sign(message).await
    }

    fn supports_cluster_switch(&self) -> bool {
        true
    }

    async fn switch_cluster(&self, cluster: &str) -> Result<(), WalletError> {
        self.select_cluster(cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSolanaWallet, SolanaCall};
    use wmux::{ChainRef, ProviderRpcError};

    const KEY: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn adapter(mock: &Arc<MockSolanaWallet>) -> SolanaAdapter {
        SolanaAdapter::new(
            "Phantom",
            Arc::clone(mock) as Arc<dyn SolanaWallet>,
            SolanaCluster::MainnetBeta,
        )
    }

    #[tokio::test]
    async fn test_connect_returns_one_account_on_cluster() {
        let mock = Arc::new(MockSolanaWallet::new(KEY));
        let accounts = adapter(&mock).connect().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, KEY);
        assert_eq!(accounts[0].chain_type, ChainType::Solana);
        assert_eq!(accounts[0].chain_id, ChainRef::named("5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp"));
        assert_eq!(accounts[0].chain_name, "Solana Mainnet");
        assert_eq!(accounts[0].name, "Primary Account");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_key() {
        let mock = Arc::new(MockSolanaWallet::new("not-a-key"));
        let err = adapter(&mock).connect().await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput { field: "public key", .. }));
    }

    #[tokio::test]
    async fn test_connect_rejection_maps_to_user_rejected() {
        let mock = Arc::new(
            MockSolanaWallet::new(KEY)
                .fail(SolanaCall::Connect, ProviderRpcError::user_rejected("User rejected the request.")),
        );
        assert!(adapter(&mock).connect().await.unwrap_err().is_user_rejected());
    }

    #[tokio::test]
    async fn test_switch_cluster_retags_accounts() {
        let mock = Arc::new(MockSolanaWallet::new(KEY));
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        adapter.switch_cluster("devnet").await.unwrap();
        let accounts = adapter.get_accounts().await.unwrap();
        assert_eq!(accounts[0].chain_name, "Solana Devnet");
        assert_eq!(adapter.cluster(), SolanaCluster::Devnet);

        let err = adapter.switch_cluster("localnet").await.unwrap_err();
        assert!(matches!(err, WalletError::Unsupported { .. }));
        assert_eq!(adapter.cluster(), SolanaCluster::Devnet);
    }

    #[tokio::test]
    async fn test_sign_transaction_decodes_base64() {
        let mock = Arc::new(MockSolanaWallet::new(KEY));
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        let signature = adapter
            .sign_transaction(&UnifiedTransactionRequest::solana("AQID"))
            .await
            .unwrap();
        assert_eq!(signature, mock.signature());
        assert_eq!(mock.sent_transactions(), vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_sign_transaction_type_mismatch_never_reaches_wallet() {
        let mock = Arc::new(MockSolanaWallet::new(KEY));
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        let err = adapter
            .sign_transaction(&UnifiedTransactionRequest::evm("0x00"))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::TypeMismatch { .. }));
        assert_eq!(mock.call_count(SolanaCall::SignAndSendTransaction), 0);
    }

    #[tokio::test]
    async fn test_sign_transaction_requires_data() {
        let mock = Arc::new(MockSolanaWallet::new(KEY));
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        let mut tx = UnifiedTransactionRequest::solana("");
        tx.data = None;
        let err = adapter.sign_transaction(&tx).await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput { field: "data", .. }));
    }

    #[tokio::test]
    async fn test_sign_message_returns_base58() {
        let mock = Arc::new(MockSolanaWallet::new(KEY).with_message_signature(vec![0, 1, 2]));
        let adapter = adapter(&mock);
        adapter.connect().await.unwrap();
        let signature = adapter.sign_message(&"hello".into()).await.unwrap();
        assert_eq!(signature, bs58::encode([0u8, 1, 2]).into_string());
        assert_eq!(mock.signed_messages(), vec![b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_skips_wallet() {
        let mock = Arc::new(MockSolanaWallet::new(KEY));
        let adapter = adapter(&mock);
        adapter.disconnect().await.unwrap();
        assert_eq!(mock.call_count(SolanaCall::Disconnect), 0);

        adapter.connect().await.unwrap();
        adapter.disconnect().await.unwrap();
        assert_eq!(mock.call_count(SolanaCall::Disconnect), 1);
        assert!(adapter.public_key().is_none());
    }
}
