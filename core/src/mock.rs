//! In-memory collaborators for exercising lockers without a chain.
//! NOT FOR PRODUCTION USE.
//!
//! Handles are cheap to clone and share state, so a test can keep one
//! copy while the locker owns another.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::asset::Asset;
use crate::clock::Clock;
use crate::error::{OracleError, TransferError};
use crate::identity::Address;
use crate::oracle::{PriceOracle, PriceReading};
use crate::transfer::AssetTransfer;

/// A price feed whose answer is set by hand.
#[derive(Debug, Clone)]
pub struct FixedPriceOracle {
    answer: Arc<RwLock<Result<PriceReading, OracleError>>>,
}

impl FixedPriceOracle {
    /// A feed answering `price`, last updated at time 0.
    pub fn new(price: i128) -> Self {
        Self {
            answer: Arc::new(RwLock::new(Ok(PriceReading {
                price,
                updated_at: 0,
            }))),
        }
    }

    pub fn set(&self, reading: PriceReading) {
        if let Ok(mut answer) = self.answer.write() {
            *answer = Ok(reading);
        }
    }

    /// Keeps the update time and changes the price.
    pub fn set_price(&self, price: i128) {
        if let Ok(mut answer) = self.answer.write() {
            let updated_at = answer.as_ref().map(|r| r.updated_at).unwrap_or_default();
            *answer = Ok(PriceReading { price, updated_at });
        }
    }

    /// Makes every read fail with [`OracleError::Unavailable`].
    pub fn fail(&self, reason: &str) {
        if let Ok(mut answer) = self.answer.write() {
            *answer = Err(OracleError::Unavailable(reason.to_string()));
        }
    }
}

impl PriceOracle for FixedPriceOracle {
    fn latest_price(&self) -> Result<PriceReading, OracleError> {
        self.answer
            .read()
            .map_err(|_| OracleError::Unavailable("poisoned".into()))?
            .clone()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn at(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Balances and token allowances for a single custodian.
///
/// Native debits settle value the caller attached, so they only move the
/// caller's native balance into custody. Token debits also consume the
/// allowance granted to the custodian.
#[derive(Debug, Clone)]
pub struct InMemoryBank {
    custodian: Address,
    balances: BTreeMap<(Address, Asset), u128>,
    allowances: BTreeMap<(Address, Address), u128>,
    failing_credits: Option<String>,
}

impl InMemoryBank {
    /// A bank in which `custodian` is the locker's own account.
    pub fn new(custodian: Address) -> Self {
        Self {
            custodian,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            failing_credits: None,
        }
    }

    pub fn custodian(&self) -> Address {
        self.custodian
    }

    pub fn mint(&mut self, account: Address, asset: Asset, amount: u128) {
        let balance = self.balances.entry((account, asset)).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &Address, asset: &Asset) -> u128 {
        self.balances
            .get(&(*account, *asset))
            .copied()
            .unwrap_or_default()
    }

    /// Sets the allowance `owner` grants the custodian on `token`.
    pub fn approve(&mut self, owner: Address, token: Address, amount: u128) {
        self.allowances.insert((owner, token), amount);
    }

    pub fn allowance(&self, owner: &Address, token: &Address) -> u128 {
        self.allowances
            .get(&(*owner, *token))
            .copied()
            .unwrap_or_default()
    }

    /// Rejects every credit until [`Self::resume_credits`].
    pub fn fail_credits(&mut self, reason: &str) {
        self.failing_credits = Some(reason.to_string());
    }

    pub fn resume_credits(&mut self) {
        self.failing_credits = None;
    }

    fn move_balance(
        &mut self,
        from: Address,
        to: Address,
        asset: Asset,
        amount: u128,
    ) -> Result<(), TransferError> {
        let available = self.balance_of(&from, &asset);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: from,
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(&to, &asset)
            .checked_add(amount)
            .ok_or(TransferError::Overflow(to))?;

        self.balances.insert((from, asset), available - amount);
        self.balances.insert((to, asset), credited);
        Ok(())
    }
}

impl AssetTransfer for InMemoryBank {
    fn debit(&mut self, from: &Address, asset: &Asset, amount: u128) -> Result<(), TransferError> {
        match asset {
            Asset::Native => self.move_balance(*from, self.custodian, *asset, amount),
            Asset::Token { contract } => {
                let approved = self.allowance(from, contract);
                if approved < amount {
                    return Err(TransferError::InsufficientAllowance {
                        owner: *from,
                        needed: amount,
                        approved,
                    });
                }
                self.move_balance(*from, self.custodian, *asset, amount)?;
                self.allowances.insert((*from, *contract), approved - amount);
                Ok(())
            }
        }
    }

    fn credit(&mut self, to: &Address, asset: &Asset, amount: u128) -> Result<(), TransferError> {
        if let Some(reason) = &self.failing_credits {
            return Err(TransferError::Rejected(reason.clone()));
        }
        self.move_balance(self.custodian, *to, *asset, amount)
    }
}
