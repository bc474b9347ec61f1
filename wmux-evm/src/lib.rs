#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EVM support for the wmux wallet layer.
//!
//! Wraps an injected EIP-1193 provider in an [`EvmAdapter`] that connects,
//! switches chains (adding unknown ones from [`ChainParamsTable`]), submits
//! transactions and signs messages.
//!
//! # Feature Flags
//!
//! - `telemetry` - Instrument adapter operations with `tracing` spans
//! - `test-utils` - Export the scripted [`testing::MockEip1193`] provider

pub mod adapter;
pub mod networks;
pub mod provider;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use adapter::{EvmAdapter, EvmSigner};
pub use networks::{AddEthereumChainParameter, ChainParamsTable, NativeCurrency};
pub use provider::{Eip1193Provider, ListenerId, ProviderEvent, ProviderFlags};
