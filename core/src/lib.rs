//! Time- and price-gated escrow of native coins and fungible tokens.
//!
//! A depositor locks value in a [`Locker`] and may take it back once the
//! lock period has passed and a price feed reads at or above a target.

/// Native coin and token assets, and deposit funding rules
pub mod asset;
pub mod clock;
/// Time lock and price target evaluation
pub mod condition;
pub mod config;
/// Deposit records and their identities
pub mod deposit;
pub mod error;
/// Account and contract identities
pub mod identity;
/// Append-only deposit store
pub mod ledger;
/// Escrow engine and its front-ends
pub mod locker;
pub mod mock;
/// Price feed integration
pub mod oracle;
pub mod transfer;
#[cfg(test)]
mod utils;

pub use asset::{Asset, AssetKind};
pub use clock::{Clock, SystemClock};
pub use condition::ReleaseCondition;
pub use config::LockerConfig;
pub use deposit::{Deposit, DepositId};
pub use error::{
    ErrorKind, EscrowError, IdentityError, LedgerError, OracleError, TransferError,
    ValidationError,
};
pub use identity::Address;
pub use ledger::Ledger;
pub use locker::{
    AnyAsset, AssetPolicy, CoinLocker, Locker, NativeLocker, NativeOnly, TokenLocker, TokenOnly,
};
pub use oracle::{PriceFeeds, PriceOracle, PriceReading};
pub use transfer::AssetTransfer;

pub type Result<T> = std::result::Result<T, EscrowError>;
