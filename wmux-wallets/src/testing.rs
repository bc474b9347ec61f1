//! Scripted Safe SDK and Ledger fakes.
//!
//! Each fake is both the port that hands out a handle and the handle itself;
//! clones share state so the test keeps an inspection handle.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use wmux::ProviderRpcError;

use crate::evm_wallet::lock;
use crate::wallets::ledger::{
    LedgerDevice, LedgerError, LedgerSignature, LedgerTransportFactory, LedgerTransportKind,
};
use crate::wallets::safe::{SafeAppsSdk, SafeInfo, SafeSdkLoader, SafeTransaction, SafeTxResponse};

#[derive(Debug)]
struct SafeState {
    info: SafeInfo,
    safe_tx_hash: String,
    load_error: Option<ProviderRpcError>,
    loads: usize,
    sent: Vec<Vec<SafeTransaction>>,
}

/// An in-memory Safe host.
#[derive(Debug, Clone)]
pub struct MockSafeSdk {
    state: Arc<Mutex<SafeState>>,
}

impl MockSafeSdk {
    /// Creates a 1-of-1 Safe at `address` on `chain_id`.
    #[must_use]
    pub fn new(address: &str, chain_id: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SafeState {
                info: SafeInfo {
                    safe_address: address.to_owned(),
                    chain_id,
                    owners: vec![address.to_owned()],
                    threshold: 1,
                },
                safe_tx_hash: format!("0x{}", "5a".repeat(32)),
                load_error: None,
                loads: 0,
                sent: Vec::new(),
            })),
        }
    }

    /// Makes `load` fail with `error`.
    #[must_use]
    pub fn fail_load(self, error: ProviderRpcError) -> Self {
        lock(&self.state).load_error = Some(error);
        self
    }

    /// Times the SDK was loaded.
    #[must_use]
    pub fn load_count(&self) -> usize {
        lock(&self.state).loads
    }

    /// Hash returned by `send_transactions`.
    #[must_use]
    pub fn safe_tx_hash(&self) -> String {
        lock(&self.state).safe_tx_hash.clone()
    }

    /// Batches proposed so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<SafeTransaction>> {
        lock(&self.state).sent.clone()
    }
}

#[async_trait]
impl SafeSdkLoader for MockSafeSdk {
    async fn load(&self) -> Result<Arc<dyn SafeAppsSdk>, ProviderRpcError> {
        let mut state = lock(&self.state);
        state.loads += 1;
        match state.load_error.clone() {
            Some(err) => Err(err),
            None => Ok(Arc::new(self.clone())),
        }
    }
}

#[async_trait]
impl SafeAppsSdk for MockSafeSdk {
    async fn safe_info(&self) -> Result<SafeInfo, ProviderRpcError> {
        Ok(lock(&self.state).info.clone())
    }

    async fn send_transactions(
        &self,
        transactions: Vec<SafeTransaction>,
    ) -> Result<SafeTxResponse, ProviderRpcError> {
        let mut state = lock(&self.state);
        state.sent.push(transactions);
        Ok(SafeTxResponse {
            safe_tx_hash: state.safe_tx_hash.clone(),
        })
    }
}

#[derive(Debug)]
struct LedgerState {
    address: String,
    signature: LedgerSignature,
    open_errors: Vec<(LedgerTransportKind, LedgerError)>,
    sign_error: Option<LedgerError>,
    opened: Vec<LedgerTransportKind>,
    signed_transactions: Vec<Vec<u8>>,
    signed_messages: Vec<Vec<u8>>,
    closes: usize,
}

/// An in-memory Ledger with the Ethereum app open.
#[derive(Debug, Clone)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    /// Creates a device deriving `address`.
    #[must_use]
    pub fn new(address: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                address: address.to_owned(),
                signature: LedgerSignature {
                    v: 27,
                    r: alloy_primitives::B256::repeat_byte(0x11),
                    s: alloy_primitives::B256::repeat_byte(0x22),
                },
                open_errors: Vec::new(),
                sign_error: None,
                opened: Vec::new(),
                signed_transactions: Vec::new(),
                signed_messages: Vec::new(),
                closes: 0,
            })),
        }
    }

    /// Sets the signature returned for every signing request.
    #[must_use]
    pub fn with_signature(self, signature: LedgerSignature) -> Self {
        lock(&self.state).signature = signature;
        self
    }

    /// Makes opening over `kind` fail.
    #[must_use]
    pub fn fail_open(self, kind: LedgerTransportKind, error: LedgerError) -> Self {
        lock(&self.state).open_errors.push((kind, error));
        self
    }

    /// Makes every signing request fail.
    #[must_use]
    pub fn fail_sign(self, error: LedgerError) -> Self {
        lock(&self.state).sign_error = Some(error);
        self
    }

    /// Transports opened, in order (including failed attempts).
    #[must_use]
    pub fn opened(&self) -> Vec<LedgerTransportKind> {
        lock(&self.state).opened.clone()
    }

    /// Number of open attempts.
    #[must_use]
    pub fn open_count(&self) -> usize {
        lock(&self.state).opened.len()
    }

    /// Unsigned RLP payloads sent for signing.
    #[must_use]
    pub fn signed_transactions(&self) -> Vec<Vec<u8>> {
        lock(&self.state).signed_transactions.clone()
    }

    /// Messages sent for signing.
    #[must_use]
    pub fn signed_messages(&self) -> Vec<Vec<u8>> {
        lock(&self.state).signed_messages.clone()
    }

    /// Number of `close` calls.
    #[must_use]
    pub fn close_count(&self) -> usize {
        lock(&self.state).closes
    }

    fn sign(&self, record: impl FnOnce(&mut LedgerState)) -> Result<LedgerSignature, LedgerError> {
        let mut state = lock(&self.state);
        if let Some(err) = state.sign_error.clone() {
            return Err(err);
        }
        record(&mut state);
        Ok(state.signature)
    }
}

#[async_trait]
impl LedgerTransportFactory for MockLedger {
    async fn open(&self, kind: LedgerTransportKind) -> Result<Arc<dyn LedgerDevice>, LedgerError> {
        let mut state = lock(&self.state);
        state.opened.push(kind);
        if let Some((_, err)) = state.open_errors.iter().find(|(k, _)| *k == kind) {
            return Err(err.clone());
        }
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl LedgerDevice for MockLedger {
    async fn get_address(&self, _path: &str) -> Result<String, LedgerError> {
        Ok(lock(&self.state).address.clone())
    }

    async fn sign_transaction(&self, _path: &str, unsigned_rlp: &[u8]) -> Result<LedgerSignature, LedgerError> {
        self.sign(|state| state.signed_transactions.push(unsigned_rlp.to_vec()))
    }

    async fn sign_personal_message(&self, _path: &str, message: &[u8]) -> Result<LedgerSignature, LedgerError> {
        self.sign(|state| state.signed_messages.push(message.to_vec()))
    }

    async fn close(&self) -> Result<(), LedgerError> {
        lock(&self.state).closes += 1;
        Ok(())
    }
}
