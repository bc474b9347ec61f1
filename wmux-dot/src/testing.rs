//! Scripted Polkadot extension for tests.
//!
//! The extension, the injected API and the signer it hands out share one
//! state, so assertions can be made on the extension handle alone.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wmux::ProviderRpcError;

use crate::extension::{
    InjectedAccount, InjectedApi, PolkadotExtension, PolkadotSigner, SignerPayloadRaw,
    SignerResult,
};

#[derive(Debug)]
struct MockState {
    accounts: Vec<InjectedAccount>,
    has_signer: bool,
    signature: String,
    enable_error: Option<ProviderRpcError>,
    sign_error: Option<ProviderRpcError>,
    enabled_with: Vec<String>,
    sign_requests: Vec<SignerPayloadRaw>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-memory [`PolkadotExtension`].
#[derive(Debug, Clone)]
pub struct MockPolkadotExtension {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
struct MockInjected {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
struct MockSigner {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockPolkadotExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPolkadotExtension {
    /// Creates an extension with no accounts and a working signer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                accounts: Vec::new(),
                has_signer: true,
                signature: format!("0x{}", "ab".repeat(64)),
                enable_error: None,
                sign_error: None,
                enabled_with: Vec::new(),
                sign_requests: Vec::new(),
            })),
        }
    }

    /// Adds an account to the list returned by `accounts.get()`.
    #[must_use]
    pub fn with_account(self, account: InjectedAccount) -> Self {
        lock(&self.state).accounts.push(account);
        self
    }

    /// Removes the signer from the injected API.
    #[must_use]
    pub fn without_signer(self) -> Self {
        lock(&self.state).has_signer = false;
        self
    }

    /// Fails `enable` with `error`.
    #[must_use]
    pub fn fail_enable(self, error: ProviderRpcError) -> Self {
        lock(&self.state).enable_error = Some(error);
        self
    }

    /// Fails `signRaw` with `error`.
    #[must_use]
    pub fn fail_sign(self, error: ProviderRpcError) -> Self {
        lock(&self.state).sign_error = Some(error);
        self
    }

    /// Replaces the account list on a shared extension.
    pub fn set_accounts(&self, accounts: Vec<InjectedAccount>) {
        lock(&self.state).accounts = accounts;
    }

    /// Returns the signature `signRaw` answers with.
    #[must_use]
    pub fn signature(&self) -> String {
        lock(&self.state).signature.clone()
    }

    /// Returns the app names `enable` was called with.
    #[must_use]
    pub fn enabled_with(&self) -> Vec<String> {
        lock(&self.state).enabled_with.clone()
    }

    /// Returns every `signRaw` payload.
    #[must_use]
    pub fn sign_requests(&self) -> Vec<SignerPayloadRaw> {
        lock(&self.state).sign_requests.clone()
    }
}

#[async_trait]
impl PolkadotExtension for MockPolkadotExtension {
    async fn enable(&self, app_name: &str) -> Result<Arc<dyn InjectedApi>, ProviderRpcError> {
        let mut state = lock(&self.state);
        state.enabled_with.push(app_name.to_owned());
        if let Some(err) = state.enable_error.clone() {
            return Err(err);
        }
        Ok(Arc::new(MockInjected {
            state: Arc::clone(&self.state),
        }))
    }
}

#[async_trait]
impl InjectedApi for MockInjected {
    async fn accounts(&self) -> Result<Vec<InjectedAccount>, ProviderRpcError> {
        Ok(lock(&self.state).accounts.clone())
    }

    fn signer(&self) -> Option<Arc<dyn PolkadotSigner>> {
        lock(&self.state).has_signer.then(|| {
            Arc::new(MockSigner {
                state: Arc::clone(&self.state),
            }) as Arc<dyn PolkadotSigner>
        })
    }
}

#[async_trait]
impl PolkadotSigner for MockSigner {
    async fn sign_raw(&self, payload: SignerPayloadRaw) -> Result<SignerResult, ProviderRpcError> {
        let mut state = lock(&self.state);
        state.sign_requests.push(payload);
        if let Some(err) = state.sign_error.clone() {
            return Err(err);
        }
        Ok(SignerResult {
            id: state.sign_requests.len() as u64,
            signature: state.signature.clone(),
        })
    }
}
