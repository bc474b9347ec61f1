//! Concrete wallets.
//!
//! Each module exposes the wallet's `NAME`, its [`WalletMeta`](wmux::WalletMeta),
//! its detector functions and a constructor wiring them into one of the
//! composition bases. Safe and Ledger carry their own provider types since
//! neither is reached through an injected EIP-1193 object.

pub mod coinbase;
pub mod ledger;
pub mod metamask;
pub mod phantom;
pub mod rabby;
pub mod safe;
pub mod subwallet;
pub mod talisman;

pub use ledger::LedgerWallet;
pub use safe::SafeWallet;
