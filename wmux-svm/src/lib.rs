#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana support for the wmux wallet layer.
//!
//! [`SolanaAdapter`] wraps an injected wallet-standard object
//! ([`SolanaWallet`]) and implements the secondary-chain contract, with
//! cluster selection in place of chain switching.
//!
//! # Feature Flags
//!
//! - `telemetry` - Instrument adapter operations with `tracing` spans
//! - `test-utils` - Export the scripted [`testing::MockSolanaWallet`]

pub mod adapter;
pub mod networks;
pub mod wallet;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use adapter::{SolanaAdapter, parse_pubkey};
pub use networks::SolanaCluster;
pub use wallet::{SolanaWallet, SolanaWalletFlags};
