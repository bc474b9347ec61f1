//! Outbound transaction and message requests.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::chain::ChainType;
use crate::error::WalletError;

/// A chain-tagged transaction request.
///
/// The common fields apply to every chain family; the gas fields and
/// `chain_id` are EVM-only and ignored by the other adapters.
///
/// Payload conventions for `data`:
///
/// - EVM: 0x-hex calldata
/// - Solana: base64 serialized transaction
/// - Polkadot: 0x-hex SCALE signing payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedTransactionRequest {
    /// Chain family the request is meant for.
    pub chain_type: ChainType,
    /// Recipient address.
    #[serde(default)]
    pub to: String,
    /// Amount in whole native units, as a decimal string (e.g. `"0.5"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Chain-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// EVM gas limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<U256>,
    /// EVM gas price, in wei.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    /// EVM chain id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

impl UnifiedTransactionRequest {
    /// Starts an EVM transfer to `to`.
    pub fn evm(to: impl Into<String>) -> Self {
        Self {
            chain_type: ChainType::Evm,
            to: to.into(),
            value: None,
            data: None,
            gas_limit: None,
            gas_price: None,
            chain_id: None,
        }
    }

    /// Wraps a base64 serialized Solana transaction.
    pub fn solana(data: impl Into<String>) -> Self {
        Self {
            chain_type: ChainType::Solana,
            data: Some(data.into()),
            ..Self::evm(String::new())
        }
    }

    /// Wraps a hex-encoded Polkadot signing payload for `signer`.
    pub fn polkadot(signer: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            chain_type: ChainType::Polkadot,
            data: Some(payload.into()),
            ..Self::evm(signer)
        }
    }

    /// Sets the transferred amount.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets the EVM gas limit.
    #[must_use]
    pub const fn with_gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Sets the EVM gas price.
    #[must_use]
    pub const fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Sets the EVM chain id.
    #[must_use]
    pub const fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Fails with [`WalletError::TypeMismatch`] unless the request targets `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::TypeMismatch`] when the chain families differ.
    pub fn ensure_chain_type(&self, expected: ChainType) -> Result<(), WalletError> {
        if self.chain_type == expected {
            Ok(())
        } else {
            Err(WalletError::TypeMismatch {
                expected,
                actual: self.chain_type,
            })
        }
    }
}

/// A message to sign: text is passed to the wallet as-is, bytes are encoded
/// the way each chain's wallets expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignableMessage {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl SignableMessage {
    /// Returns the message as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

impl From<&str> for SignableMessage {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SignableMessage {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for SignableMessage {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for SignableMessage {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_chain_type() {
        let tx = UnifiedTransactionRequest::solana("AQID");
        assert!(tx.ensure_chain_type(ChainType::Solana).is_ok());
        let err = tx.ensure_chain_type(ChainType::Evm).unwrap_err();
        assert!(matches!(
            err,
            WalletError::TypeMismatch {
                expected: ChainType::Evm,
                actual: ChainType::Solana
            }
        ));
    }

    #[test]
    fn test_deserialize_gas_fields() {
        let tx: UnifiedTransactionRequest = serde_json::from_value(serde_json::json!({
            "chainType": "evm",
            "to": "0x0000000000000000000000000000000000000001",
            "value": "0.25",
            "gasLimit": "0x5208",
            "chainId": 137
        }))
        .unwrap();
        assert_eq!(tx.gas_limit, Some(U256::from(21_000u64)));
        assert_eq!(tx.chain_id, Some(137));
        assert!(tx.gas_price.is_none());
    }

    #[test]
    fn test_signable_message_bytes() {
        let text = SignableMessage::from("hi");
        assert_eq!(text.as_bytes(), b"hi");
        let raw = SignableMessage::from(vec![0xde, 0xad]);
        assert_eq!(raw.as_bytes(), &[0xde, 0xad]);
    }
}
