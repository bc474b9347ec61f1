//! Ports for `window.injectedWeb3[...]` extensions.
//!
//! An extension is enabled once per app name and hands back an injected API
//! exposing the account list and, optionally, a raw-payload signer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use wmux::ProviderRpcError;

/// An account as listed by `injected.accounts.get()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectedAccount {
    /// SS58 address.
    pub address: String,
    /// Name the user gave the account in the extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Network the account is restricted to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_hash: Option<String>,
    /// Key type (`sr25519`, `ed25519`, `ethereum`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
}

impl InjectedAccount {
    /// Creates an unrestricted, unnamed account.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            genesis_hash: None,
            key_type: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restricts the account to one network.
    #[must_use]
    pub fn with_genesis_hash(mut self, genesis_hash: impl Into<String>) -> Self {
        self.genesis_hash = Some(genesis_hash.into());
        self
    }
}

/// Interpretation of [`SignerPayloadRaw::data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawPayloadKind {
    /// Arbitrary bytes; the extension wraps them in `<Bytes>` before signing.
    Bytes,
    /// An encoded extrinsic signing payload.
    Payload,
}

/// Argument of `signer.signRaw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerPayloadRaw {
    /// Signing account.
    pub address: String,
    /// 0x-hex data.
    pub data: String,
    /// How `data` is interpreted.
    #[serde(rename = "type")]
    pub kind: RawPayloadKind,
}

/// Result of `signer.signRaw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerResult {
    /// Request id assigned by the extension.
    pub id: u64,
    /// 0x-hex signature.
    pub signature: String,
}

/// An injected extension entry (`window.injectedWeb3[name]`).
#[async_trait]
pub trait PolkadotExtension: Send + Sync + fmt::Debug {
    /// Asks the user to authorise `app_name` and returns the injected API.
    ///
    /// # Errors
    ///
    /// Returns the extension's rejection unchanged.
    async fn enable(&self, app_name: &str) -> Result<Arc<dyn InjectedApi>, ProviderRpcError>;
}

/// The API returned by [`PolkadotExtension::enable`].
#[async_trait]
pub trait InjectedApi: Send + Sync + fmt::Debug {
    /// Lists the accounts the user exposed to this app.
    ///
    /// # Errors
    ///
    /// Returns the extension's error unchanged.
    async fn accounts(&self) -> Result<Vec<InjectedAccount>, ProviderRpcError>;

    /// Returns the signer, if the extension provides one.
    fn signer(&self) -> Option<Arc<dyn PolkadotSigner>>;
}

/// `injected.signer`.
#[async_trait]
pub trait PolkadotSigner: Send + Sync + fmt::Debug {
    /// Signs raw data (`signer.signRaw`).
    ///
    /// # Errors
    ///
    /// Returns the extension's error unchanged.
    async fn sign_raw(&self, payload: SignerPayloadRaw) -> Result<SignerResult, ProviderRpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_from_extension_json() {
        let account: InjectedAccount = serde_json::from_value(json!({
            "address": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
            "genesisHash": null,
            "name": "Alice",
            "type": "sr25519"
        }))
        .unwrap();
        assert_eq!(account.name.as_deref(), Some("Alice"));
        assert_eq!(account.key_type.as_deref(), Some("sr25519"));
        assert!(account.genesis_hash.is_none());
    }

    #[test]
    fn test_sign_raw_payload_shape() {
        let payload = SignerPayloadRaw {
            address: "5Grw".into(),
            data: "0x00".into(),
            kind: RawPayloadKind::Bytes,
        };
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            json!({ "address": "5Grw", "data": "0x00", "type": "bytes" })
        );
    }
}
