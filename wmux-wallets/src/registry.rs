//! The wallet registry.
//!
//! [`WalletRegistry::build`] is called once by the application's composition
//! root. It reads the configuration, constructs every wallet in display order
//! and answers discovery queries; it performs no I/O and connects nothing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use wmux::config::WalletConfig;
use wmux::{ChainType, UnifiedWalletProvider, WalletCategory};
use wmux_dot::PolkadotNetwork;
use wmux_evm::{ChainParamsTable, Eip1193Provider};
use wmux_svm::SolanaCluster;

use crate::detect::is_safe_context;
use crate::env::BrowserContext;
use crate::wallets::ledger::{LedgerTransportFactory, LedgerWallet};
use crate::wallets::safe::{SafeSdkLoader, SafeWallet};
use crate::wallets::{coinbase, metamask, phantom, rabby, subwallet, talisman};

/// Ports that cannot be discovered on the window.
#[derive(Debug, Clone, Default)]
pub struct WalletServices {
    /// Imports the Safe Apps SDK.
    pub safe_sdk: Option<Arc<dyn SafeSdkLoader>>,
    /// Opens Ledger devices.
    pub ledger_transport: Option<Arc<dyn LedgerTransportFactory>>,
    /// RPC used to fill and broadcast Ledger transactions.
    pub ledger_rpc: Option<Arc<dyn Eip1193Provider>>,
}

impl WalletServices {
    /// Sets the Safe Apps SDK loader.
    #[must_use]
    pub fn with_safe_sdk(mut self, loader: Arc<dyn SafeSdkLoader>) -> Self {
        self.safe_sdk = Some(loader);
        self
    }

    /// Sets the Ledger transport factory and RPC.
    #[must_use]
    pub fn with_ledger(
        mut self,
        transport: Arc<dyn LedgerTransportFactory>,
        rpc: Option<Arc<dyn Eip1193Provider>>,
    ) -> Self {
        self.ledger_transport = Some(transport);
        self.ledger_rpc = rpc;
        self
    }
}

/// Every wallet the application offers, in display order.
pub struct WalletRegistry {
    wallets: Vec<Arc<dyn UnifiedWalletProvider>>,
    networks: Arc<ChainParamsTable>,
    safe_available: bool,
}

fn parse_or_default<T: FromStr + Default + fmt::Display>(field: &'static str, value: &str) -> T
where
    T::Err: fmt::Display,
{
    value.parse().unwrap_or_else(|err| {
        let fallback = T::default();
        tracing::warn!(field, value, error = %err, fallback = %fallback, "Invalid configuration value, using default");
        fallback
    })
}

impl WalletRegistry {
    /// Builds every wallet from `config`.
    ///
    /// Safe is only included when the page is a Safe App at build time.
    #[must_use]
    pub fn build(ctx: Arc<BrowserContext>, config: &WalletConfig, services: WalletServices) -> Self {
        let networks = Arc::new(ChainParamsTable::known().with_overrides(config.chain_overrides()));
        let cluster: SolanaCluster = parse_or_default("solana_cluster", &config.solana_cluster);
        let network: PolkadotNetwork = parse_or_default("polkadot_network", &config.polkadot_network);
        let default_chain = config.default_evm_chain;

        let mut wallets: Vec<Arc<dyn UnifiedWalletProvider>> = vec![
            Arc::new(metamask::wallet(Arc::clone(&ctx), Arc::clone(&networks), default_chain)),
            Arc::new(rabby::wallet(Arc::clone(&ctx), Arc::clone(&networks), default_chain)),
            Arc::new(phantom::wallet(Arc::clone(&ctx), Arc::clone(&networks), default_chain, cluster)),
            Arc::new(coinbase::wallet(
                Arc::clone(&ctx),
                Arc::clone(&networks),
                config.coinbase_default_chain,
                cluster,
            )),
            Arc::new(talisman::wallet(
                Arc::clone(&ctx),
                Arc::clone(&networks),
                default_chain,
                &config.app_name,
                network,
            )),
            Arc::new(subwallet::wallet(
                Arc::clone(&ctx),
                Arc::clone(&networks),
                default_chain,
                &config.app_name,
                network,
            )),
        ];

        let safe_available = ctx
            .window()
            .is_some_and(|window| is_safe_context(&window, &config.safe_origins));
        if safe_available {
            wallets.push(Arc::new(SafeWallet::new(
                Arc::clone(&ctx),
                config.safe_origins.clone(),
                services.safe_sdk,
                Arc::clone(&networks),
            )));
        }

        let mut ledger = LedgerWallet::new(
            Arc::clone(&ctx),
            services.ledger_transport,
            services.ledger_rpc,
            Arc::clone(&networks),
        )
        .with_derivation_path(config.ledger_derivation_path.as_str());
        if let Some(chain_id) = default_chain {
            ledger = ledger.with_chain(chain_id);
        }
        wallets.push(Arc::new(ledger));

        tracing::debug!(wallets = wallets.len(), safe_available, "Wallet registry built");
        Self {
            wallets,
            networks,
            safe_available,
        }
    }

    /// All wallets, in display order.
    #[must_use]
    pub fn all(&self) -> &[Arc<dyn UnifiedWalletProvider>] {
        &self.wallets
    }

    /// Wallets whose injected object is present right now.
    #[must_use]
    pub fn installed(&self) -> Vec<Arc<dyn UnifiedWalletProvider>> {
        self.filtered(|w| w.is_installed())
    }

    /// Wallets in `category`.
    #[must_use]
    pub fn by_category(&self, category: WalletCategory) -> Vec<Arc<dyn UnifiedWalletProvider>> {
        self.filtered(|w| w.category() == category)
    }

    /// Wallets that can connect to `chain_type`.
    #[must_use]
    pub fn by_chain_type(&self, chain_type: ChainType) -> Vec<Arc<dyn UnifiedWalletProvider>> {
        self.filtered(|w| w.meta().supports(chain_type))
    }

    /// Looks a wallet up by display name, ignoring case.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn UnifiedWalletProvider>> {
        self.wallets
            .iter()
            .find(|w| w.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    /// Returns `true` if the page was a Safe App when the registry was built.
    #[must_use]
    pub const fn is_safe_available(&self) -> bool {
        self.safe_available
    }

    /// The EVM chain table every wallet shares.
    #[must_use]
    pub fn networks(&self) -> &ChainParamsTable {
        &self.networks
    }

    fn filtered(
        &self,
        keep: impl Fn(&dyn UnifiedWalletProvider) -> bool,
    ) -> Vec<Arc<dyn UnifiedWalletProvider>> {
        self.wallets
            .iter()
            .filter(|w| keep(w.as_ref()))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for WalletRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.wallets.iter().map(|w| w.name()).collect();
        f.debug_struct("WalletRegistry")
            .field("wallets", &names)
            .field("safe_available", &self.safe_available)
            .finish_non_exhaustive()
    }
}
