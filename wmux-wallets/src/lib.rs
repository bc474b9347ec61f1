#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Browser wallets and the wallet registry.
//!
//! Wallets are built from two composition bases: [`EvmWallet`] for
//! EVM-only extensions and [`MultiChainWallet`] for extensions that also
//! inject a Solana or Polkadot object. Safe and Ledger are standalone
//! providers over their own ports. Everything is discovered from a
//! [`BrowserWindow`] snapshot through detector functions, so nothing here
//! reads a global.
//!
//! ```ignore
//! let registry = WalletRegistry::build(ctx, &WalletConfig::load()?, services);
//! for wallet in registry.installed() {
//!     println!("{} ({:?})", wallet.name(), wallet.detected_chains());
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `telemetry` - Instrument adapter and provider operations with `tracing` spans
//! - `test-utils` - Export the [`testing`] Safe SDK and Ledger fakes

pub mod detect;
pub mod env;
pub mod evm_wallet;
pub mod multichain;
pub mod registry;
pub mod wallets;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use env::{BrowserContext, BrowserWindow};
pub use evm_wallet::EvmWallet;
pub use multichain::{MultiChainWallet, SecondaryConnector};
pub use registry::{WalletRegistry, WalletServices};
pub use wallets::{LedgerWallet, SafeWallet};
