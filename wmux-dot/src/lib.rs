#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Polkadot support for the wmux wallet layer.
//!
//! [`PolkadotAdapter`] enables an injected extension
//! (`window.injectedWeb3[...]`), filters its accounts to the configured relay
//! chain and signs through the extension's raw signer.
//!
//! # Feature Flags
//!
//! - `telemetry` - Instrument adapter operations with `tracing` spans
//! - `test-utils` - Export the scripted [`testing::MockPolkadotExtension`]

pub mod adapter;
pub mod extension;
pub mod networks;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use adapter::PolkadotAdapter;
pub use extension::{
    InjectedAccount, InjectedApi, PolkadotExtension, PolkadotSigner, RawPayloadKind,
    SignerPayloadRaw, SignerResult,
};
pub use networks::{PolkadotNetwork, is_ss58_address};
