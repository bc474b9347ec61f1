//! Error taxonomy for wallet adapters and providers.
//!
//! [`ProviderRpcError`] is what an injected wallet object rejects with; it
//! mirrors the EIP-1193 error shape and is reused by the Solana and Polkadot
//! ports since those wallets reject with the same `{code, message}` objects.
//!
//! [`WalletError`] is the single error type crossing the provider boundary.
//! Every variant names the wallet involved so the UI can render a useful
//! message without inspecting the cause chain.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chain::ChainType;

/// An error returned by an injected wallet object.
///
/// Shaped after the EIP-1193 `ProviderRpcError`: a numeric code, a message
/// and optional vendor data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRpcError {
    /// Numeric error code (EIP-1193 or JSON-RPC).
    pub code: i64,
    /// Human-readable message supplied by the wallet.
    pub message: String,
    /// Vendor-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProviderRpcError {
    /// The user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// The requested method or account has not been authorized.
    pub const UNAUTHORIZED: i64 = 4100;
    /// The wallet does not support the requested method.
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// The wallet is disconnected from all chains.
    pub const DISCONNECTED: i64 = 4900;
    /// The wallet is not connected to the requested chain.
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    /// The requested chain has not been added to the wallet.
    pub const CHAIN_NOT_ADDED: i64 = 4902;
    /// JSON-RPC internal error, which some mobile wallets use as a wrapper.
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Creates a new error with the given code and message.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches vendor data to the error.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Shorthand for a 4001 rejection.
    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(Self::USER_REJECTED, message)
    }

    /// Returns `true` if the user declined the request in the wallet UI.
    #[must_use]
    pub fn is_user_rejected(&self) -> bool {
        self.effective_code() == Self::USER_REJECTED
    }

    /// Returns `true` if the wallet does not know the requested chain.
    #[must_use]
    pub fn is_chain_not_added(&self) -> bool {
        self.effective_code() == Self::CHAIN_NOT_ADDED
    }

    /// Returns the code, unwrapping `{code: -32603, data: {originalError: {code}}}`.
    #[must_use]
    pub fn effective_code(&self) -> i64 {
        if self.code == Self::INTERNAL_ERROR {
            let nested = self
                .data
                .as_ref()
                .and_then(|d| d.get("originalError"))
                .and_then(|e| e.get("code"))
                .and_then(serde_json::Value::as_i64);
            if let Some(code) = nested {
                return code;
            }
        }
        self.code
    }
}

impl fmt::Display for ProviderRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for ProviderRpcError {}

/// Errors surfaced by chain adapters and wallet providers.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The wallet's injected object is absent.
    #[error("{wallet} is not installed")]
    NotInstalled {
        /// Wallet name.
        wallet: String,
    },

    /// The wallet granted access but returned zero accounts.
    #[error("{wallet} returned no {chain_type} accounts")]
    NoAccounts {
        /// Wallet name.
        wallet: String,
        /// Chain family that was queried.
        chain_type: ChainType,
    },

    /// None of the requested chain families produced an account.
    #[error("{wallet}: no accounts connected")]
    NoAccountsConnected {
        /// Wallet name.
        wallet: String,
        /// The last failure seen while connecting, if any branch failed.
        #[source]
        source: Option<Box<WalletError>>,
    },

    /// The operation needs a connection that has not been established.
    #[error("{wallet} is not connected on {chain_type}")]
    NotConnected {
        /// Wallet name.
        wallet: String,
        /// Chain family the operation targeted.
        chain_type: ChainType,
    },

    /// The user declined the request in the wallet UI.
    #[error("{message}")]
    UserRejected {
        /// Wallet name.
        wallet: String,
        /// Operation that was declined (e.g. `"connect"`).
        operation: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// The target chain is unknown to the wallet and could not be added.
    #[error("{wallet} does not know chain {chain_id} and no parameters are available to add it")]
    ChainNotAdded {
        /// Wallet name.
        wallet: String,
        /// The chain that was requested.
        chain_id: u64,
    },

    /// The operation is not meaningful for this wallet or chain.
    #[error("{wallet} does not support {operation}: {reason}")]
    Unsupported {
        /// Wallet name.
        wallet: String,
        /// Operation that was attempted.
        operation: &'static str,
        /// Why it is unsupported.
        reason: String,
    },

    /// A request tagged for one chain family reached an adapter for another.
    #[error("chain type mismatch: adapter handles {expected}, request is for {actual}")]
    TypeMismatch {
        /// Family the adapter handles.
        expected: ChainType,
        /// Family the request was tagged with.
        actual: ChainType,
    },

    /// A hardware device could not be reached; the user can fix this and retry.
    #[error("{wallet} device unavailable: {reason}")]
    DeviceUnavailable {
        /// Wallet name.
        wallet: String,
        /// User-facing hint.
        reason: String,
    },

    /// A request field could not be interpreted.
    #[error("{wallet}: invalid {field}: {reason}")]
    InvalidInput {
        /// Wallet name.
        wallet: String,
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The injected object rejected the request for another reason.
    #[error("{wallet} {operation} failed: {source}")]
    Provider {
        /// Wallet name.
        wallet: String,
        /// Operation in flight.
        operation: &'static str,
        /// Underlying wallet error, unchanged.
        #[source]
        source: ProviderRpcError,
    },
}

impl WalletError {
    /// Wraps a wallet-side rejection, mapping 4001 to [`WalletError::UserRejected`].
    pub fn from_rpc(
        wallet: impl Into<String>,
        operation: &'static str,
        source: ProviderRpcError,
    ) -> Self {
        let wallet = wallet.into();
        if source.is_user_rejected() {
            Self::UserRejected {
                message: format!("{wallet}: request to {operation} was rejected"),
                wallet,
                operation,
            }
        } else {
            Self::Provider {
                wallet,
                operation,
                source,
            }
        }
    }

    /// Shorthand for [`WalletError::Unsupported`].
    pub fn unsupported(
        wallet: impl Into<String>,
        operation: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unsupported {
            wallet: wallet.into(),
            operation,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`WalletError::InvalidInput`].
    pub fn invalid(
        wallet: impl Into<String>,
        field: &'static str,
        reason: impl fmt::Display,
    ) -> Self {
        Self::InvalidInput {
            wallet: wallet.into(),
            field,
            reason: reason.to_string(),
        }
    }

    /// Returns the wallet the error originated from, if recorded.
    #[must_use]
    pub fn wallet(&self) -> Option<&str> {
        match self {
            Self::NotInstalled { wallet }
            | Self::NoAccounts { wallet, .. }
            | Self::NoAccountsConnected { wallet, .. }
            | Self::NotConnected { wallet, .. }
            | Self::UserRejected { wallet, .. }
            | Self::ChainNotAdded { wallet, .. }
            | Self::Unsupported { wallet, .. }
            | Self::DeviceUnavailable { wallet, .. }
            | Self::InvalidInput { wallet, .. }
            | Self::Provider { wallet, .. } => Some(wallet),
            Self::TypeMismatch { .. } => None,
        }
    }

    /// Returns the underlying wallet error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Provider { source, .. } => Some(source.effective_code()),
            Self::UserRejected { .. } => Some(ProviderRpcError::USER_REJECTED),
            Self::ChainNotAdded { .. } => Some(ProviderRpcError::CHAIN_NOT_ADDED),
            _ => None,
        }
    }

    /// Returns `true` if the user declined the request.
    #[must_use]
    pub const fn is_user_rejected(&self) -> bool {
        matches!(self, Self::UserRejected { .. })
    }

    /// Returns `true` if retrying after user action may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UserRejected { .. } | Self::DeviceUnavailable { .. } | Self::NotConnected { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_code_unwraps_mobile_wrapper() {
        let err = ProviderRpcError::new(ProviderRpcError::INTERNAL_ERROR, "Internal error")
            .with_data(serde_json::json!({ "originalError": { "code": 4902 } }));
        assert!(err.is_chain_not_added());
        assert_eq!(err.effective_code(), 4902);
    }

    #[test]
    fn test_internal_error_without_wrapper_keeps_code() {
        let err = ProviderRpcError::new(ProviderRpcError::INTERNAL_ERROR, "boom");
        assert_eq!(err.effective_code(), -32603);
        assert!(!err.is_chain_not_added());
    }

    #[test]
    fn test_from_rpc_maps_rejection() {
        let err = WalletError::from_rpc(
            "MetaMask",
            "connect",
            ProviderRpcError::user_rejected("User rejected the request."),
        );
        assert!(err.is_user_rejected());
        assert!(err.is_recoverable());
        assert_eq!(err.wallet(), Some("MetaMask"));
        assert_eq!(err.code(), Some(4001));
    }

    #[test]
    fn test_from_rpc_keeps_other_errors() {
        let err = WalletError::from_rpc(
            "Rabby",
            "sign_message",
            ProviderRpcError::new(ProviderRpcError::UNAUTHORIZED, "Unauthorized"),
        );
        assert!(matches!(err, WalletError::Provider { .. }));
        assert_eq!(err.code(), Some(4100));
        assert!(err.to_string().contains("Rabby sign_message failed"));
    }
}
