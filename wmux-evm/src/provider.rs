//! The EIP-1193 injected-provider port.
//!
//! A browser binding implements [`Eip1193Provider`] over `window.ethereum`
//! (or a vendor-specific object such as `window.phantom.ethereum`). The
//! adapter only ever talks to this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use wmux::ProviderRpcError;

/// A standard EIP-1193 event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEvent {
    /// `accountsChanged`, payload: array of addresses.
    AccountsChanged,
    /// `chainChanged`, payload: 0x-hex chain id.
    ChainChanged,
    /// `disconnect`, payload: a `ProviderRpcError`.
    Disconnect,
}

impl ProviderEvent {
    /// Returns the JavaScript event name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for ProviderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`Eip1193Provider::on`], passed back to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A listener receiving the raw event payload.
pub type EventListener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Vendor flags set on an injected EIP-1193 object.
///
/// Several wallets set `isMetaMask` for compatibility, so detection must look
/// at the whole set, not one flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderFlags {
    /// `isMetaMask`.
    pub is_meta_mask: bool,
    /// `isRabby`.
    pub is_rabby: bool,
    /// `isPhantom`.
    pub is_phantom: bool,
    /// `isCoinbaseWallet`.
    pub is_coinbase_wallet: bool,
    /// `isTalisman`.
    pub is_talisman: bool,
    /// `isSubWallet`.
    pub is_sub_wallet: bool,
    /// `isBraveWallet`.
    pub is_brave_wallet: bool,
}

impl ProviderFlags {
    /// Returns `true` if any wallet other than MetaMask claims the object.
    #[must_use]
    pub const fn is_impersonating_metamask(&self) -> bool {
        self.is_rabby
            || self.is_phantom
            || self.is_coinbase_wallet
            || self.is_talisman
            || self.is_sub_wallet
            || self.is_brave_wallet
    }
}

/// An EIP-1193 provider object.
#[async_trait]
pub trait Eip1193Provider: Send + Sync + fmt::Debug {
    /// Sends a JSON-RPC request (`provider.request({ method, params })`).
    ///
    /// # Errors
    ///
    /// Returns the wallet's [`ProviderRpcError`] unchanged.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    /// Registers a listener (`provider.on(event, listener)`).
    fn on(&self, event: ProviderEvent, listener: EventListener) -> ListenerId;

    /// Removes a listener (`provider.removeListener(event, listener)`).
    fn remove_listener(&self, event: ProviderEvent, id: ListenerId);

    /// Vendor flags on the object.
    fn flags(&self) -> ProviderFlags {
        ProviderFlags::default()
    }
}

/// Parses an EIP-1193 quantity: 0x-hex string, decimal string or JSON number.
#[must_use]
pub fn parse_quantity(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .map_or_else(|| s.parse().ok(), |hex| u64::from_str_radix(hex, 16).ok()),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Parses an account list payload.
#[must_use]
pub fn parse_accounts(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_str().map(ToOwned::to_owned))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!("0x1")), Some(1));
        assert_eq!(parse_quantity(&json!("0x507")), Some(1287));
        assert_eq!(parse_quantity(&json!("8453")), Some(8453));
        assert_eq!(parse_quantity(&json!(137)), Some(137));
        assert_eq!(parse_quantity(&json!("0xzz")), None);
        assert_eq!(parse_quantity(&json!(null)), None);
    }

    #[test]
    fn test_parse_accounts() {
        let accounts = parse_accounts(&json!(["0xabc", "0xdef"])).unwrap();
        assert_eq!(accounts, vec!["0xabc", "0xdef"]);
        assert!(parse_accounts(&json!("0xabc")).is_none());
    }

    #[test]
    fn test_flags_from_js_object() {
        let flags: ProviderFlags =
            serde_json::from_value(json!({ "isMetaMask": true, "isRabby": true })).unwrap();
        assert!(flags.is_meta_mask);
        assert!(flags.is_impersonating_metamask());
        let plain: ProviderFlags = serde_json::from_value(json!({ "isMetaMask": true })).unwrap();
        assert!(!plain.is_impersonating_metamask());
    }
}
