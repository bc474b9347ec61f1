//! Ledger hardware wallet (Ethereum app) over WebUSB or WebBluetooth.
//!
//! The device only signs. Nonce, gas price and gas limit are filled through
//! an EIP-1193 RPC port, the unsigned legacy transaction is RLP-encoded with
//! EIP-155 replay protection, and the signed bytes are broadcast with
//! `eth_sendRawTransaction`.

use alloy_primitives::utils::parse_ether;
use alloy_primitives::{Address, B256, Bytes, U256, hex};
use alloy_rlp::{Encodable, Header};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use wmux::account::account_label;
use wmux::{
    ChainRef, ChainType, ProviderRpcError, SignableMessage, UnifiedAccount, UnifiedTransactionRequest,
    UnifiedWalletProvider, WalletCategory, WalletError, WalletMeta,
};
use wmux_evm::provider::parse_quantity;
use wmux_evm::{ChainParamsTable, Eip1193Provider};

use crate::detect::has_hardware_transport;
use crate::env::BrowserContext;
use crate::evm_wallet::{lock, logged};

/// Display name.
pub const NAME: &str = "Ledger";
/// Icon asset.
pub const ICON: &str = "/wallets/ledger.svg";
/// BIP-32 path of the first Ethereum account.
pub const DEFAULT_DERIVATION_PATH: &str = "44'/60'/0'/0/0";

/// Static metadata.
#[must_use]
pub fn meta() -> WalletMeta {
    WalletMeta::new(NAME, ICON, WalletCategory::Hardware, vec![ChainType::Evm])
}

/// An APDU-level failure reported by the device or its transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LedgerError {
    /// APDU status word, when the device answered.
    pub status: Option<u16>,
    /// Transport or device message.
    pub message: String,
}

impl LedgerError {
    /// The user denied the request on the device.
    pub const USER_DENIED: u16 = 0x6985;
    /// The device is locked.
    pub const LOCKED: u16 = 0x5515;
    /// Security status not satisfied (locked on older firmware).
    pub const SECURITY_NOT_SATISFIED: u16 = 0x6982;
    /// Instruction not supported (wrong app open).
    pub const INS_NOT_SUPPORTED: u16 = 0x6d00;
    /// Class not supported (dashboard open).
    pub const CLA_NOT_SUPPORTED: u16 = 0x6e00;
    /// No app open.
    pub const APP_NOT_OPEN: u16 = 0x6511;

    /// A transport-level failure with no status word.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// A device answer carrying `status`.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Maps the failure onto the wallet error taxonomy.
    #[must_use]
    pub fn into_wallet_error(self, operation: &'static str) -> WalletError {
        let unavailable = |reason: &str| WalletError::DeviceUnavailable {
            wallet: NAME.to_owned(),
            reason: reason.to_owned(),
        };
        match self.status {
            Some(Self::USER_DENIED) => WalletError::UserRejected {
                wallet: NAME.to_owned(),
                operation,
                message: format!("{NAME}: request to {operation} was rejected on the device"),
            },
            Some(Self::LOCKED | Self::SECURITY_NOT_SATISFIED) => {
                unavailable("unlock your Ledger and try again")
            }
            Some(Self::INS_NOT_SUPPORTED | Self::CLA_NOT_SUPPORTED | Self::APP_NOT_OPEN) => {
                unavailable("open the Ethereum app on your Ledger and try again")
            }
            None if self.message.to_ascii_lowercase().contains("not found") => {
                unavailable("connect your Ledger and try again")
            }
            status => WalletError::Provider {
                wallet: NAME.to_owned(),
                operation,
                source: ProviderRpcError::new(
                    status.map_or(ProviderRpcError::INTERNAL_ERROR, i64::from),
                    self.message,
                ),
            },
        }
    }
}

/// How the browser reaches the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerTransportKind {
    /// WebUSB.
    Usb,
    /// WebBluetooth.
    Bluetooth,
}

/// An ECDSA signature as returned by the Ethereum app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSignature {
    /// Recovery value. Legacy (27/28) or EIP-155, possibly truncated to the
    /// low byte by older firmware; only its parity is used.
    pub v: u64,
    /// `r`.
    pub r: B256,
    /// `s`.
    pub s: B256,
}

impl LedgerSignature {
    /// Returns the y-parity bit.
    #[must_use]
    pub const fn y_parity(&self) -> bool {
        if self.v <= 1 { self.v == 1 } else { self.v % 2 == 0 }
    }

    /// Returns the 65-byte `r || s || v` encoding with `v` in 27/28 form.
    #[must_use]
    pub fn to_rsv(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(self.r.as_slice());
        out[32..64].copy_from_slice(self.s.as_slice());
        out[64] = 27 + u8::from(self.y_parity());
        out
    }
}

/// An open connection to the Ethereum app.
#[async_trait]
pub trait LedgerDevice: Send + Sync + fmt::Debug {
    /// Derives the address at `path`.
    ///
    /// # Errors
    ///
    /// Returns the device or transport failure.
    async fn get_address(&self, path: &str) -> Result<String, LedgerError>;

    /// Signs an RLP-encoded unsigned transaction.
    ///
    /// # Errors
    ///
    /// Returns the device or transport failure.
    async fn sign_transaction(&self, path: &str, unsigned_rlp: &[u8]) -> Result<LedgerSignature, LedgerError>;

    /// Signs a message with the `personal_sign` prefix.
    ///
    /// # Errors
    ///
    /// Returns the device or transport failure.
    async fn sign_personal_message(&self, path: &str, message: &[u8]) -> Result<LedgerSignature, LedgerError>;

    /// Releases the transport.
    ///
    /// # Errors
    ///
    /// Returns the transport failure.
    async fn close(&self) -> Result<(), LedgerError>;
}

/// Opens device connections.
#[async_trait]
pub trait LedgerTransportFactory: Send + Sync + fmt::Debug {
    /// Prompts for a device over `kind` and opens the Ethereum app.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, e.g. no device selected.
    async fn open(&self, kind: LedgerTransportKind) -> Result<Arc<dyn LedgerDevice>, LedgerError>;
}

#[derive(Debug)]
struct LedgerSession {
    device: Arc<dyn LedgerDevice>,
    address: Address,
}

/// A Ledger device exposing one EVM account.
pub struct LedgerWallet {
    meta: WalletMeta,
    ctx: Arc<BrowserContext>,
    transports: Option<Arc<dyn LedgerTransportFactory>>,
    rpc: Option<Arc<dyn Eip1193Provider>>,
    networks: Arc<ChainParamsTable>,
    derivation_path: String,
    chain_id: Mutex<u64>,
    session: Mutex<Option<Arc<LedgerSession>>>,
}

impl LedgerWallet {
    /// Creates the provider. `rpc` is used to fill and broadcast transactions.
    pub fn new(
        ctx: Arc<BrowserContext>,
        transports: Option<Arc<dyn LedgerTransportFactory>>,
        rpc: Option<Arc<dyn Eip1193Provider>>,
        networks: Arc<ChainParamsTable>,
    ) -> Self {
        Self {
            meta: meta(),
            ctx,
            transports,
            rpc,
            networks,
            derivation_path: DEFAULT_DERIVATION_PATH.to_owned(),
            chain_id: Mutex::new(1),
            session: Mutex::new(None),
        }
    }

    /// Sets the BIP-32 derivation path.
    #[must_use]
    pub fn with_derivation_path(mut self, path: impl Into<String>) -> Self {
        self.derivation_path = path.into();
        self
    }

    /// Sets the chain transactions are signed for until `switch_chain`.
    #[must_use]
    pub fn with_chain(self, chain_id: u64) -> Self {
        *lock(&self.chain_id) = chain_id;
        self
    }

    /// Returns the chain transactions are signed for.
    #[must_use]
    pub fn chain_id(&self) -> u64 {
        *lock(&self.chain_id)
    }

    fn fail(operation: &'static str, err: WalletError) -> WalletError {
        logged(NAME, operation, err)
    }

    fn device_error(operation: &'static str, err: LedgerError) -> WalletError {
        tracing::warn!(operation, status = ?err.status, message = %err.message, "Ledger device error");
        Self::fail(operation, err.into_wallet_error(operation))
    }

    fn not_yet_supported(operation: &'static str, chain_type: ChainType) -> Result<(), WalletError> {
        if chain_type == ChainType::Evm {
            return Ok(());
        }
        Err(Self::fail(
            operation,
            WalletError::unsupported(
                NAME,
                operation,
                format!("{} is not yet supported on Ledger", chain_type.display_name()),
            ),
        ))
    }

    fn require_session(&self, operation: &'static str) -> Result<Arc<LedgerSession>, WalletError> {
        lock(&self.session).clone().ok_or_else(|| {
            Self::fail(
                operation,
                WalletError::NotConnected {
                    wallet: NAME.to_owned(),
                    chain_type: ChainType::Evm,
                },
            )
        })
    }

    fn account(&self, address: Address) -> UnifiedAccount {
        let chain_id = self.chain_id();
        UnifiedAccount::new(
            address.to_string(),
            ChainType::Evm,
            ChainRef::Evm(chain_id),
            self.networks.chain_name(chain_id),
            NAME,
            account_label(0),
        )
    }

    async fn open_device(
        &self,
        factory: &dyn LedgerTransportFactory,
    ) -> Result<Arc<dyn LedgerDevice>, WalletError> {
        let transports = self.ctx.window().map(|w| w.transports).unwrap_or_default();
        if transports.webusb {
            match factory.open(LedgerTransportKind::Usb).await {
                Ok(device) => return Ok(device),
                Err(err) if transports.webbluetooth => {
                    tracing::warn!(error = %err, "Ledger USB transport failed, trying Bluetooth");
                }
                Err(err) => return Err(Self::device_error("connect", err)),
            }
        }
        factory
            .open(LedgerTransportKind::Bluetooth)
            .await
            .map_err(|err| Self::device_error("connect", err))
    }

    async fn derive_address(&self, device: &dyn LedgerDevice) -> Result<Address, WalletError> {
        let raw = device
            .get_address(&self.derivation_path)
            .await
            .map_err(|err| Self::device_error("connect", err))?;
        Address::from_str(&raw)
            .map_err(|e| Self::fail("connect", WalletError::invalid(NAME, "address", e)))
    }

    async fn rpc_call(
        rpc: &dyn Eip1193Provider,
        method: &str,
        params: Value,
    ) -> Result<Value, WalletError> {
        tracing::debug!(method, "Ledger RPC request");
        rpc.request(method, params).await.map_err(|source| {
            Self::fail("sign_transaction", WalletError::from_rpc(NAME, "sign_transaction", source))
        })
    }

    async fn rpc_quantity(
        rpc: &dyn Eip1193Provider,
        method: &str,
        params: Value,
    ) -> Result<U256, WalletError> {
        let raw = Self::rpc_call(rpc, method, params).await?;
        raw.as_str()
            .and_then(|s| U256::from_str(s).ok())
            .or_else(|| parse_quantity(&raw).map(U256::from))
            .ok_or_else(|| {
                Self::fail(
                    "sign_transaction",
                    WalletError::invalid(NAME, "rpc response", format!("{method} returned {raw}")),
                )
            })
    }
}

/// Fields of an EIP-155 legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LegacyTransaction {
    nonce: u64,
    gas_price: U256,
    gas_limit: U256,
    to: Address,
    value: U256,
    input: Bytes,
    chain_id: u64,
}

impl LegacyTransaction {
    /// `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])`.
    fn encode_for_signing(&self) -> Vec<u8> {
        rlp_list(&[
            &self.nonce,
            &self.gas_price,
            &self.gas_limit,
            &self.to,
            &self.value,
            &self.input,
            &self.chain_id,
            &0u8,
            &0u8,
        ])
    }

    /// `rlp([nonce, gasPrice, gas, to, value, data, v, r, s])` with
    /// `v = chainId * 2 + 35 + parity`. `None` when `v` overflows.
    fn encode_signed(&self, signature: &LedgerSignature) -> Option<Vec<u8>> {
        let v = eip155_v(self.chain_id, signature.y_parity())?;
        let r = U256::from_be_bytes(signature.r.0);
        let s = U256::from_be_bytes(signature.s.0);
        Some(rlp_list(&[
            &self.nonce,
            &self.gas_price,
            &self.gas_limit,
            &self.to,
            &self.value,
            &self.input,
            &v,
            &r,
            &s,
        ]))
    }
}

/// Returns `chainId * 2 + 35 + parity`, or `None` on overflow.
fn eip155_v(chain_id: u64, y_parity: bool) -> Option<u64> {
    chain_id
        .checked_mul(2)?
        .checked_add(35 + u64::from(y_parity))
}

fn rlp_list(fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length: usize = fields.iter().map(|field| field.length()).sum();
    let mut out = Vec::with_capacity(payload_length + 3);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}

#[async_trait]
impl UnifiedWalletProvider for LedgerWallet {
    fn meta(&self) -> &WalletMeta {
        &self.meta
    }

    fn detected_chains(&self) -> Vec<ChainType> {
        if self.is_installed() {
            vec![ChainType::Evm]
        } else {
            Vec::new()
        }
    }

    fn is_installed(&self) -> bool {
        self.ctx
            .window()
            .is_some_and(|window| has_hardware_transport(&window))
    }

    #[cfg_attr(feature = "telemetry", tracing::instrument(skip(self), err))]
    async fn connect(
        &self,
        chain_type: Option<ChainType>,
    ) -> Result<Vec<UnifiedAccount>, WalletError> {
        if let Some(chain_type) = chain_type {
            Self::not_yet_supported("connect", chain_type)?;
        }
        let not_installed = || {
            Self::fail(
                "connect",
                WalletError::NotInstalled {
                    wallet: NAME.to_owned(),
                },
            )
        };
        if !self.is_installed() {
            return Err(not_installed());
        }
        let factory = self.transports.clone().ok_or_else(not_installed)?;
        let device = self.open_device(factory.as_ref()).await?;
        let address = match self.derive_address(device.as_ref()).await {
            Ok(address) => address,
            Err(err) => {
                if let Err(close_err) = device.close().await {
                    tracing::warn!(error = %close_err, "Failed to close Ledger transport after a failed connect");
                }
                return Err(err);
            }
        };

        let previous = lock(&self.session).replace(Arc::new(LedgerSession { device, address }));
        if let Some(previous) = previous {
            if let Err(err) = previous.device.close().await {
                tracing::warn!(error = %err, "Failed to close previous Ledger transport");
            }
        }
        tracing::info!(%address, path = %self.derivation_path, "Ledger connected");
        Ok(vec![self.account(address)])
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        let Some(session) = lock(&self.session).take() else {
            return Ok(());
        };
        session
            .device
            .close()
            .await
            .map_err(|err| Self::device_error("disconnect", err))?;
        tracing::info!("Ledger disconnected");
        Ok(())
    }

    async fn get_accounts(
        &self,
        chain_type: Option<ChainType>,
    ) -> Result<Vec<UnifiedAccount>, WalletError> {
        if chain_type.is_some_and(|t| t != ChainType::Evm) {
            return Ok(Vec::new());
        }
        let address = lock(&self.session).as_ref().map(|s| s.address);
        Ok(address.map(|a| vec![self.account(a)]).unwrap_or_default())
    }

    async fn switch_chain(
        &self,
        chain_id: ChainRef,
        chain_type: ChainType,
    ) -> Result<(), WalletError> {
        Self::not_yet_supported("switch_chain", chain_type)?;
        let id = chain_id.as_evm().ok_or_else(|| {
            Self::fail(
                "switch_chain",
                WalletError::invalid(NAME, "chain_id", format!("{chain_id} is not an EVM chain id")),
            )
        })?;
        if !self.networks.contains(id) {
            return Err(Self::fail(
                "switch_chain",
                WalletError::ChainNotAdded {
                    wallet: NAME.to_owned(),
                    chain_id: id,
                },
            ));
        }
        *lock(&self.chain_id) = id;
        tracing::info!(chain_id = id, "Ledger chain switched");
        Ok(())
    }

    #[cfg_attr(feature = "telemetry", tracing::instrument(skip_all, err))]
    async fn sign_transaction(
        &self,
        tx: &UnifiedTransactionRequest,
    ) -> Result<String, WalletError> {
        const OP: &str = "sign_transaction";
        Self::not_yet_supported(OP, tx.chain_type)?;
        let session = self.require_session(OP)?;
        let rpc = self.rpc.clone().ok_or_else(|| {
            Self::fail(OP, WalletError::unsupported(NAME, OP, "no RPC endpoint configured for Ledger"))
        })?;
        let invalid = |field: &'static str, reason: String| Self::fail(OP, WalletError::invalid(NAME, field, reason));

        let to = Address::from_str(&tx.to).map_err(|e| invalid("to", e.to_string()))?;
        let value = match tx.value.as_deref() {
            Some(value) => parse_ether(value).map_err(|e| invalid("value", e.to_string()))?,
            None => U256::ZERO,
        };
        let input = match tx.data.as_deref() {
            Some(data) => Bytes::from(hex::decode(data).map_err(|e| invalid("data", e.to_string()))?),
            None => Bytes::new(),
        };
        let chain_id = tx.chain_id.unwrap_or_else(|| self.chain_id());
        if eip155_v(chain_id, true).is_none() {
            return Err(invalid("chainId", format!("{chain_id} is too large for EIP-155 signing")));
        }
        let from = session.address.to_string();

        let nonce = Self::rpc_quantity(rpc.as_ref(), "eth_getTransactionCount", json!([from, "pending"])).await?;
        let nonce = u64::try_from(nonce).map_err(|e| invalid("nonce", e.to_string()))?;
        let gas_price = match tx.gas_price {
            Some(price) => price,
            None => Self::rpc_quantity(rpc.as_ref(), "eth_gasPrice", json!([])).await?,
        };
        let gas_limit = match tx.gas_limit {
            Some(limit) => limit,
            None => {
                let estimate = json!([{
                    "from": from,
                    "to": to.to_string(),
                    "value": format!("{value:#x}"),
                    "data": hex::encode_prefixed(&input),
                }]);
                Self::rpc_quantity(rpc.as_ref(), "eth_estimateGas", estimate).await?
            }
        };

        let unsigned = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            input,
            chain_id,
        };
        tracing::debug!(%to, chain_id, nonce, "Requesting Ledger signature");
        let signature = session
            .device
            .sign_transaction(&self.derivation_path, &unsigned.encode_for_signing())
            .await
            .map_err(|err| Self::device_error(OP, err))?;
        let signed = unsigned
            .encode_signed(&signature)
            .ok_or_else(|| invalid("chainId", format!("{chain_id} is too large for EIP-155 signing")))?;
        let raw = hex::encode_prefixed(signed);

        let hash = Self::rpc_call(rpc.as_ref(), "eth_sendRawTransaction", json!([raw])).await?;
        hash.as_str()
            .and_then(|s| B256::from_str(s).ok())
            .map(|h| h.to_string())
            .ok_or_else(|| invalid("transaction hash", format!("unexpected {hash}")))
    }

    async fn sign_message(
        &self,
        message: &SignableMessage,
        chain_type: ChainType,
    ) -> Result<String, WalletError> {
        Self::not_yet_supported("sign_message", chain_type)?;
        let session = self.require_session("sign_message")?;
        let signature = session
            .device
            .sign_personal_message(&self.derivation_path, message.as_bytes())
            .await
            .map_err(|err| Self::device_error("sign_message", err))?;
        Ok(hex::encode_prefixed(signature.to_rsv()))
    }
}

impl fmt::Debug for LedgerWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerWallet")
            .field("derivation_path", &self.derivation_path)
            .field("chain_id", &self.chain_id())
            .field("has_transport", &self.transports.is_some())
            .field("has_rpc", &self.rpc.is_some())
            .finish_non_exhaustive()
    }
}
