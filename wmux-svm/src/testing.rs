//! Scripted Solana wallet for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use wmux::ProviderRpcError;

use crate::wallet::{SolanaWallet, SolanaWalletFlags};

/// Operations a [`MockSolanaWallet`] records and can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolanaCall {
    /// `connect`.
    Connect,
    /// `disconnect`.
    Disconnect,
    /// `signAndSendTransaction`.
    SignAndSendTransaction,
    /// `signMessage`.
    SignMessage,
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<SolanaCall>,
    transactions: Vec<Vec<u8>>,
    messages: Vec<Vec<u8>>,
    connected: bool,
}

/// An in-memory [`SolanaWallet`] that returns a fixed public key.
#[derive(Debug)]
pub struct MockSolanaWallet {
    public_key: String,
    flags: SolanaWalletFlags,
    signature: String,
    message_signature: Vec<u8>,
    failures: Mutex<HashMap<SolanaCall, ProviderRpcError>>,
    recorded: Mutex<Recorded>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockSolanaWallet {
    /// Creates a wallet answering `connect` with `public_key`.
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            flags: SolanaWalletFlags::default(),
            signature: bs58::encode([7u8; 64]).into_string(),
            message_signature: vec![9u8; 64],
            failures: Mutex::new(HashMap::new()),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Sets the vendor flags.
    #[must_use]
    pub fn with_flags(mut self, flags: SolanaWalletFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the transaction signature returned by `signAndSendTransaction`.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Sets the raw bytes returned by `signMessage`.
    #[must_use]
    pub fn with_message_signature(mut self, signature: Vec<u8>) -> Self {
        self.message_signature = signature;
        self
    }

    /// Fails every `call` with `error`.
    #[must_use]
    pub fn fail(self, call: SolanaCall, error: ProviderRpcError) -> Self {
        lock(&self.failures).insert(call, error);
        self
    }

    /// Returns the transaction signature this wallet hands out.
    #[must_use]
    pub fn signature(&self) -> String {
        self.signature.clone()
    }

    /// Returns how many times `call` was made.
    #[must_use]
    pub fn call_count(&self, call: SolanaCall) -> usize {
        lock(&self.recorded).calls.iter().filter(|c| **c == call).count()
    }

    /// Returns every transaction passed to `signAndSendTransaction`.
    #[must_use]
    pub fn sent_transactions(&self) -> Vec<Vec<u8>> {
        lock(&self.recorded).transactions.clone()
    }

    /// Returns every message passed to `signMessage`.
    #[must_use]
    pub fn signed_messages(&self) -> Vec<Vec<u8>> {
        lock(&self.recorded).messages.clone()
    }

    fn record(&self, call: SolanaCall) -> Result<(), ProviderRpcError> {
        lock(&self.recorded).calls.push(call);
        match lock(&self.failures).get(&call) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SolanaWallet for MockSolanaWallet {
    async fn connect(&self) -> Result<String, ProviderRpcError> {
        self.record(SolanaCall::Connect)?;
        lock(&self.recorded).connected = true;
        Ok(self.public_key.clone())
    }

    async fn disconnect(&self) -> Result<(), ProviderRpcError> {
        self.record(SolanaCall::Disconnect)?;
        lock(&self.recorded).connected = false;
        Ok(())
    }

    fn public_key(&self) -> Option<String> {
        lock(&self.recorded)
            .connected
            .then(|| self.public_key.clone())
    }

    async fn sign_and_send_transaction(
        &self,
        transaction: &[u8],
    ) -> Result<String, ProviderRpcError> {
        self.record(SolanaCall::SignAndSendTransaction)?;
        lock(&self.recorded).transactions.push(transaction.to_vec());
        Ok(self.signature.clone())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ProviderRpcError> {
        self.record(SolanaCall::SignMessage)?;
        lock(&self.recorded).messages.push(message.to_vec());
        Ok(self.message_signature.clone())
    }

    fn flags(&self) -> SolanaWalletFlags {
        self.flags
    }
}
