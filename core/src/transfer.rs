//! Movement of value in and out of custody.

use crate::asset::Asset;
use crate::error::TransferError;
use crate::identity::Address;

/// Moves value between accounts and the locker's custody.
///
/// For [`Asset::Native`] the debit settles value already attached to the
/// creating call. For [`Asset::Token`] it pulls through the allowance the
/// owner granted to the locker, and the credit is a plain push.
///
/// A failed call must leave balances untouched.
pub trait AssetTransfer {
    /// Takes `amount` of `asset` from `from` into custody.
    fn debit(&mut self, from: &Address, asset: &Asset, amount: u128) -> Result<(), TransferError>;

    /// Releases `amount` of `asset` from custody to `to`.
    fn credit(&mut self, to: &Address, asset: &Asset, amount: u128) -> Result<(), TransferError>;
}

impl<T: AssetTransfer + ?Sized> AssetTransfer for &mut T {
    fn debit(&mut self, from: &Address, asset: &Asset, amount: u128) -> Result<(), TransferError> {
        (**self).debit(from, asset, amount)
    }

    fn credit(&mut self, to: &Address, asset: &Asset, amount: u128) -> Result<(), TransferError> {
        (**self).credit(to, asset, amount)
    }
}

impl<T: AssetTransfer + ?Sized> AssetTransfer for Box<T> {
    fn debit(&mut self, from: &Address, asset: &Asset, amount: u128) -> Result<(), TransferError> {
        (**self).debit(from, asset, amount)
    }

    fn credit(&mut self, to: &Address, asset: &Asset, amount: u128) -> Result<(), TransferError> {
        (**self).credit(to, asset, amount)
    }
}
