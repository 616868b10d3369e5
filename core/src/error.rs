use thiserror::Error;

use crate::condition;
use crate::deposit::DepositId;
use crate::identity::Address;

/// Escrow-related errors.
///
/// The `Display` text of the rejection variants is matched on by callers
/// and must stay stable.
#[derive(Debug, Error, PartialEq)]
pub enum EscrowError {
    /// Malformed deposit request; nothing was debited or stored.
    #[error("{0}")]
    Validation(ValidationError),

    /// Redeemer is not the depositor.
    #[error("Only the depositor can redeem their deposit")]
    Unauthorized,

    /// Attempted a second redemption of the same deposit.
    #[error("Deposit has already been redeemed")]
    AlreadyRedeemed,

    /// Time or price condition not met yet.
    #[error("Deposit cannot be redeemed yet")]
    NotRedeemable,

    #[error("deposit {0} not found")]
    NotFound(DepositId),

    #[error("transfer failed: {0}")]
    Transfer(TransferError),

    #[error("price oracle error: {0}")]
    Oracle(OracleError),

    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    #[error("identity error: {0}")]
    Identity(IdentityError),
}

/// Coarse classification of [`EscrowError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected before any mutation.
    Validation,
    /// Caller does not own the deposit.
    Authorization,
    /// Retryable later; includes double redemption.
    ConditionNotMet,
    NotFound,
    /// External debit or credit failed.
    Transfer,
    /// The price feed could not produce a usable reading.
    Oracle,
    /// Snapshot or identity decoding.
    Storage,
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthorized => ErrorKind::Authorization,
            Self::AlreadyRedeemed | Self::NotRedeemable => ErrorKind::ConditionNotMet,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Transfer(_) => ErrorKind::Transfer,
            Self::Oracle(_) => ErrorKind::Oracle,
            Self::Ledger(_) | Self::Identity(_) => ErrorKind::Storage,
        }
    }
}

/// Errors raised while validating a deposit request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Token amount must be greater than 0")]
    TokenAmountZero,

    /// Native value attached to a token deposit.
    #[error("Invalid deposit")]
    InvalidDeposit,

    #[error("ETH deposit required")]
    NativeDepositRequired,

    #[error("There was no ETH sent with this transaction to lock")]
    NoNativeValueSent,

    #[error("Unknown price feed {0}")]
    UnknownPriceFeed(Address),

    #[error("Lock period of {0} days is too long")]
    LockTooLong(u64),
}

/// Errors reported by an [`AssetTransfer`](crate::AssetTransfer) implementation.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TransferError {
    #[error("insufficient balance of {account}: needed {needed}, available {available}")]
    InsufficientBalance {
        account: Address,
        needed: u128,
        available: u128,
    },

    #[error("insufficient allowance from {owner}: needed {needed}, approved {approved}")]
    InsufficientAllowance {
        owner: Address,
        needed: u128,
        approved: u128,
    },

    #[error("balance overflow for {0}")]
    Overflow(Address),

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Errors reported while reading a price feed.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum OracleError {
    #[error("no price feed registered at {0}")]
    UnknownFeed(Address),

    #[error("price feed unavailable: {0}")]
    Unavailable(String),

    #[error("non-positive price reading: {0}")]
    NonPositivePrice(i128),

    #[error("stale price: updated at {updated_at}, now {now}, max age {max_age}s")]
    Stale {
        updated_at: u64,
        now: u64,
        max_age: u64,
    },
}

/// Errors from ledger snapshots.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("snapshot encoding failed: {0}")]
    Encode(String),

    #[error("snapshot decoding failed: {0}")]
    Decode(String),

    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

/// Errors that might occur while parsing an [`Address`].
#[derive(Debug, Error, PartialEq)]
pub enum IdentityError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("cannot parse identity from empty string")]
    EmptyIdentity,

    #[error("expected a 20-byte address, got {0} bytes")]
    InvalidLength(usize),
}

impl From<ValidationError> for EscrowError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TransferError> for EscrowError {
    fn from(value: TransferError) -> Self {
        Self::Transfer(value)
    }
}

impl From<OracleError> for EscrowError {
    fn from(value: OracleError) -> Self {
        Self::Oracle(value)
    }
}

impl From<LedgerError> for EscrowError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<condition::Error> for EscrowError {
    fn from(value: condition::Error) -> Self {
        match value {
            condition::Error::Oracle(e) => Self::Oracle(e),
            condition::Error::TimeLocked { .. } | condition::Error::BelowTarget { .. } => {
                Self::NotRedeemable
            }
        }
    }
}

impl From<IdentityError> for EscrowError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}
