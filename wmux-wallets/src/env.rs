//! Snapshot of the browser globals wallets inject.
//!
//! A wasm binding fills a [`BrowserWindow`] from `window` on each discovery
//! pass; tests build one by hand. [`BrowserContext`] holds the current
//! snapshot, or nothing when running outside a browser.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use wmux_dot::PolkadotExtension;
use wmux_evm::Eip1193Provider;
use wmux_svm::SolanaWallet;

/// `window.phantom`.
#[derive(Clone, Default)]
pub struct PhantomInjection {
    /// `window.phantom.ethereum`.
    pub ethereum: Option<Arc<dyn Eip1193Provider>>,
    /// `window.phantom.solana`.
    pub solana: Option<Arc<dyn SolanaWallet>>,
}

/// How the page is embedded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameContext {
    /// `window !== window.parent`.
    pub is_framed: bool,
    /// `location.ancestorOrigins`, where the browser exposes it.
    pub ancestor_origins: Option<Vec<String>>,
    /// `document.referrer`, when non-empty.
    pub referrer: Option<String>,
}

/// Hardware transports the browser offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportSupport {
    /// `navigator.usb`.
    pub webusb: bool,
    /// `navigator.bluetooth`.
    pub webbluetooth: bool,
}

/// The injected objects wallets are detected from.
#[derive(Clone, Default)]
pub struct BrowserWindow {
    /// `window.ethereum`.
    pub ethereum: Option<Arc<dyn Eip1193Provider>>,
    /// `window.ethereum.providers`, set when several extensions inject.
    pub ethereum_providers: Vec<Arc<dyn Eip1193Provider>>,
    /// `window.phantom`.
    pub phantom: PhantomInjection,
    /// `window.coinbaseWalletExtension`.
    pub coinbase_wallet_extension: Option<Arc<dyn Eip1193Provider>>,
    /// `window.coinbaseSolana`.
    pub coinbase_solana: Option<Arc<dyn SolanaWallet>>,
    /// `window.talismanEth`.
    pub talisman_eth: Option<Arc<dyn Eip1193Provider>>,
    /// `window.SubWallet`.
    pub subwallet: Option<Arc<dyn Eip1193Provider>>,
    /// `window.injectedWeb3`, keyed by extension name.
    pub injected_web3: BTreeMap<String, Arc<dyn PolkadotExtension>>,
    /// Frame embedding.
    pub frame: FrameContext,
    /// Hardware transports.
    pub transports: TransportSupport,
}

impl BrowserWindow {
    /// Creates a window with nothing injected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `window.ethereum`.
    #[must_use]
    pub fn with_ethereum(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.ethereum = Some(provider);
        self
    }

    /// Adds an entry to `window.ethereum.providers`.
    #[must_use]
    pub fn with_ethereum_provider(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.ethereum_providers.push(provider);
        self
    }

    /// Sets `window.phantom.ethereum`.
    #[must_use]
    pub fn with_phantom_ethereum(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.phantom.ethereum = Some(provider);
        self
    }

    /// Sets `window.phantom.solana`.
    #[must_use]
    pub fn with_phantom_solana(mut self, wallet: Arc<dyn SolanaWallet>) -> Self {
        self.phantom.solana = Some(wallet);
        self
    }

    /// Sets `window.coinbaseWalletExtension`.
    #[must_use]
    pub fn with_coinbase_extension(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.coinbase_wallet_extension = Some(provider);
        self
    }

    /// Sets `window.coinbaseSolana`.
    #[must_use]
    pub fn with_coinbase_solana(mut self, wallet: Arc<dyn SolanaWallet>) -> Self {
        self.coinbase_solana = Some(wallet);
        self
    }

    /// Sets `window.talismanEth`.
    #[must_use]
    pub fn with_talisman_eth(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.talisman_eth = Some(provider);
        self
    }

    /// Sets `window.SubWallet`.
    #[must_use]
    pub fn with_subwallet(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.subwallet = Some(provider);
        self
    }

    /// Sets `window.injectedWeb3[name]`.
    #[must_use]
    pub fn with_injected_web3(
        mut self,
        name: impl Into<String>,
        extension: Arc<dyn PolkadotExtension>,
    ) -> Self {
        self.injected_web3.insert(name.into(), extension);
        self
    }

    /// Marks the page as framed with the given ancestor origins and referrer.
    #[must_use]
    pub fn framed(mut self, ancestor_origins: Option<Vec<String>>, referrer: Option<String>) -> Self {
        self.frame = FrameContext {
            is_framed: true,
            ancestor_origins,
            referrer,
        };
        self
    }

    /// Sets the hardware transports.
    #[must_use]
    pub const fn with_transports(mut self, webusb: bool, webbluetooth: bool) -> Self {
        self.transports = TransportSupport {
            webusb,
            webbluetooth,
        };
        self
    }

    /// EIP-1193 objects in lookup order: `window.ethereum.providers` first,
    /// then `window.ethereum`.
    pub fn ethereum_candidates(&self) -> impl Iterator<Item = &Arc<dyn Eip1193Provider>> {
        self.ethereum_providers.iter().chain(self.ethereum.iter())
    }
}

impl fmt::Debug for PhantomInjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhantomInjection")
            .field("ethereum", &self.ethereum.is_some())
            .field("solana", &self.solana.is_some())
            .finish()
    }
}

impl fmt::Debug for BrowserWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserWindow")
            .field("ethereum", &self.ethereum.is_some())
            .field("ethereum_providers", &self.ethereum_providers.len())
            .field("phantom", &self.phantom)
            .field("injected_web3", &self.injected_web3.keys().collect::<Vec<_>>())
            .field("frame", &self.frame)
            .field("transports", &self.transports)
            .finish_non_exhaustive()
    }
}

/// The current browser window, shared by every provider in a registry.
#[derive(Debug, Default)]
pub struct BrowserContext {
    window: RwLock<Option<Arc<BrowserWindow>>>,
}

impl BrowserContext {
    /// Creates a context over `window`.
    #[must_use]
    pub fn new(window: BrowserWindow) -> Self {
        Self {
            window: RwLock::new(Some(Arc::new(window))),
        }
    }

    /// Creates a context with no window (server-side rendering, tests).
    #[must_use]
    pub fn headless() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn window(&self) -> Option<Arc<BrowserWindow>> {
        self.window
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the snapshot, e.g. after an extension injects late.
    pub fn set_window(&self, window: Option<BrowserWindow>) {
        *self.window.write().unwrap_or_else(PoisonError::into_inner) = window.map(Arc::new);
    }
}
