//! Deposit records.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetKind};
use crate::condition::ReleaseCondition;
use crate::identity::Address;

/// Sequential deposit identity, starting at 1.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct DepositId(u64);

impl DepositId {
    pub const FIRST: Self = Self(1);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for DepositId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DepositId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single escrow record.
///
/// Everything but `redeemed` is fixed at creation.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Deposit {
    pub id: DepositId,
    /// Account that created the deposit and the only one allowed to redeem it.
    pub depositor: Address,
    /// What is locked.
    pub asset: Asset,
    /// Feed consulted for the price half of the condition.
    pub price_feed: Address,
    /// Quantity locked, in the asset's smallest unit. Never zero.
    pub amount: u128,
    pub condition: ReleaseCondition,
    /// Unix time (seconds) of creation.
    pub created_at: u64,
    pub redeemed: bool,
}

impl Deposit {
    pub fn asset_kind(&self) -> AssetKind {
        self.asset.kind()
    }

    /// Token contract, `None` for native deposits.
    pub fn token(&self) -> Option<Address> {
        self.asset.token()
    }

    pub fn unlock_timestamp(&self) -> u64 {
        self.condition.unlock_timestamp
    }

    pub fn unlock_price(&self) -> u128 {
        self.condition.unlock_price
    }

    /// Locked and not yet paid out.
    pub fn is_locked(&self) -> bool {
        !self.redeemed
    }
}
