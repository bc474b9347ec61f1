#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Chain-agnostic core of the wmux wallet adapter layer.
//!
//! This crate provides the types shared by every chain adapter and wallet
//! provider. Chain-specific adapters live in separate crates
//! (`wmux-evm`, `wmux-svm`, `wmux-dot`), and concrete wallets plus the
//! registry live in `wmux-wallets`.
//!
//! # Overview
//!
//! A UI asks the registry for installed wallets, calls
//! [`UnifiedWalletProvider::connect`](provider::UnifiedWalletProvider::connect)
//! on the chosen one, and receives [`UnifiedAccount`](account::UnifiedAccount)s
//! regardless of which chain family produced them. Transactions go back down
//! as chain-tagged [`UnifiedTransactionRequest`](transaction::UnifiedTransactionRequest)s.
//!
//! # Modules
//!
//! - [`account`] - Unified account model and id derivation
//! - [`cache`] - TTL cache with an injected clock
//! - [`chain`] - Chain families and chain identifiers
//! - [`config`] - TOML configuration with environment expansion
//! - [`error`] - Error taxonomy shared by adapters and providers
//! - [`events`] - Wallet event handlers and listener cleanup
//! - [`price`] - Cached USD price lookups
//! - [`provider`] - The unified wallet-provider and secondary-adapter traits
//! - [`transaction`] - Chain-tagged transaction and message requests

pub mod account;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod events;
pub mod price;
pub mod provider;
pub mod transaction;

pub use account::UnifiedAccount;
pub use chain::{ChainRef, ChainType};
pub use error::{ProviderRpcError, WalletError};
pub use provider::{SecondaryChainAdapter, UnifiedWalletProvider, WalletCategory, WalletMeta};
pub use transaction::{SignableMessage, UnifiedTransactionRequest};
