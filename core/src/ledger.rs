//! Deposit table and per-depositor index.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::condition::ReleaseCondition;
use crate::deposit::{Deposit, DepositId};
use crate::error::{EscrowError, LedgerError, ValidationError};
use crate::identity::Address;
use crate::Result;

/// Fields of a deposit about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeposit {
    pub depositor: Address,
    pub asset: Asset,
    pub price_feed: Address,
    pub amount: u128,
    pub condition: ReleaseCondition,
    pub created_at: u64,
}

/// Append-only store of deposits.
///
/// Deposit `n` lives at index `n - 1`; records are never removed.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(try_from = "UncheckedLedger"))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Ledger {
    deposits: Vec<Deposit>,
    by_depositor: BTreeMap<Address, Vec<DepositId>>,
}

/// JSON form of a [`Ledger`] before its invariants are checked.
#[cfg(feature = "json")]
#[derive(Deserialize)]
struct UncheckedLedger {
    deposits: Vec<Deposit>,
    by_depositor: BTreeMap<Address, Vec<DepositId>>,
}

#[cfg(feature = "json")]
impl TryFrom<UncheckedLedger> for Ledger {
    type Error = LedgerError;

    fn try_from(raw: UncheckedLedger) -> std::result::Result<Self, Self::Error> {
        let ledger = Self {
            deposits: raw.deposits,
            by_depositor: raw.by_depositor,
        };
        ledger.check_invariants()?;
        Ok(ledger)
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deposits ever created.
    pub fn len(&self) -> usize {
        self.deposits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }

    /// Identity the next recorded deposit will receive.
    pub fn next_id(&self) -> DepositId {
        DepositId::new(self.deposits.len() as u64 + 1)
    }

    /// Records a new, unredeemed deposit and indexes it under its depositor.
    pub fn insert(&mut self, new: NewDeposit) -> Result<DepositId> {
        if new.amount == 0 {
            return Err(ValidationError::InvalidDeposit.into());
        }
        let id = self.next_id();

        self.deposits.push(Deposit {
            id,
            depositor: new.depositor,
            asset: new.asset,
            price_feed: new.price_feed,
            amount: new.amount,
            condition: new.condition,
            created_at: new.created_at,
            redeemed: false,
        });
        self.by_depositor.entry(new.depositor).or_default().push(id);

        Ok(id)
    }

    pub fn get(&self, id: DepositId) -> Result<&Deposit> {
        Self::index(id)
            .and_then(|i| self.deposits.get(i))
            .ok_or(EscrowError::NotFound(id))
    }

    /// Ids created by `depositor`, oldest first.
    pub fn deposits_of(&self, depositor: &Address) -> &[DepositId] {
        self.by_depositor
            .get(depositor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All deposits, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Deposit> {
        self.deposits.iter()
    }

    /// Flips `redeemed` on, rejecting a second flip.
    pub(crate) fn mark_redeemed(&mut self, id: DepositId) -> Result<()> {
        let deposit = self.get_mut(id)?;
        if deposit.redeemed {
            return Err(EscrowError::AlreadyRedeemed);
        }
        deposit.redeemed = true;
        Ok(())
    }

    /// Undoes [`Self::mark_redeemed`] when the payout could not be made.
    pub(crate) fn revert_redeemed(&mut self, id: DepositId) -> Result<()> {
        self.get_mut(id)?.redeemed = false;
        Ok(())
    }

    /// Sum held in custody for `asset` across unredeemed deposits.
    pub fn total_locked(&self, asset: &Asset) -> u128 {
        self.deposits
            .iter()
            .filter(|d| d.is_locked() && d.asset == *asset)
            .fold(0u128, |acc, d| acc.saturating_add(d.amount))
    }

    /// Encodes the ledger with bincode's standard configuration.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| LedgerError::Encode(e.to_string()).into())
    }

    /// Decodes a snapshot produced by [`Self::to_bytes`] and checks its invariants.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (ledger, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| LedgerError::Decode(e.to_string()))?;
        if read != bytes.len() {
            return Err(LedgerError::Corrupt(format!(
                "{} trailing bytes",
                bytes.len() - read
            ))
            .into());
        }
        ledger.check_invariants()?;
        Ok(ledger)
    }

    /// Sequential ids, positive amounts, and an index that covers every
    /// deposit exactly once under its own depositor.
    pub fn check_invariants(&self) -> std::result::Result<(), LedgerError> {
        for (i, deposit) in self.deposits.iter().enumerate() {
            if deposit.id.get() != i as u64 + 1 {
                return Err(LedgerError::Corrupt(format!(
                    "deposit at position {} has id {}",
                    i, deposit.id
                )));
            }
            if deposit.amount == 0 {
                return Err(LedgerError::Corrupt(format!(
                    "deposit {} has zero amount",
                    deposit.id
                )));
            }
        }

        let mut indexed = 0usize;
        for (depositor, ids) in &self.by_depositor {
            for window in ids.windows(2) {
                if window[0] >= window[1] {
                    return Err(LedgerError::Corrupt(format!(
                        "index of {} is not ascending",
                        depositor
                    )));
                }
            }
            for id in ids {
                let owner = Self::index(*id)
                    .and_then(|i| self.deposits.get(i))
                    .map(|d| d.depositor);
                if owner != Some(*depositor) {
                    return Err(LedgerError::Corrupt(format!(
                        "deposit {} indexed under {}",
                        id, depositor
                    )));
                }
            }
            indexed += ids.len();
        }
        if indexed != self.deposits.len() {
            return Err(LedgerError::Corrupt(format!(
                "{} deposits but {} indexed",
                self.deposits.len(),
                indexed
            )));
        }

        Ok(())
    }

    fn get_mut(&mut self, id: DepositId) -> Result<&mut Deposit> {
        Self::index(id)
            .and_then(|i| self.deposits.get_mut(i))
            .ok_or(EscrowError::NotFound(id))
    }

    fn index(id: DepositId) -> Option<usize> {
        id.get()
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
    }
}
