//! Release condition: a time lock combined with a price target.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// Both halves must hold for a deposit to be released.
///
/// An `unlock_price` of zero is satisfied by any valid reading; the feed
/// is still consulted.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct ReleaseCondition {
    /// Unix time (seconds) from which the time lock is open.
    pub unlock_timestamp: u64,

    /// Minimum reference price, in the feed's unit.
    pub unlock_price: u128,
}

impl ReleaseCondition {
    /// Builds a condition opening `lock_seconds` after `now`.
    ///
    /// Returns `None` if the unlock time does not fit in a `u64`.
    pub fn after(now: u64, lock_seconds: u64, unlock_price: u128) -> Option<Self> {
        now.checked_add(lock_seconds).map(|unlock_timestamp| Self {
            unlock_timestamp,
            unlock_price,
        })
    }

    pub fn time_elapsed(&self, now: u64) -> bool {
        now >= self.unlock_timestamp
    }

    pub fn price_reached(&self, price: i128) -> bool {
        u128::try_from(price).is_ok_and(|price| price >= self.unlock_price)
    }

    /// Verifies the time lock, then the price target.
    ///
    /// `price` is only invoked once the time lock is open.
    pub fn verify<F>(&self, now: u64, price: F) -> Result<(), Error>
    where
        F: FnOnce() -> Result<i128, OracleError>,
    {
        if !self.time_elapsed(now) {
            return Err(Error::TimeLocked {
                now,
                unlock_timestamp: self.unlock_timestamp,
            });
        }

        let price = price()?;
        self.price_reached(price)
            .then_some(())
            .ok_or(Error::BelowTarget {
                price,
                unlock_price: self.unlock_price,
            })
    }
}

/// Release condition verification errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("locked until {unlock_timestamp}, now {now}")]
    TimeLocked { now: u64, unlock_timestamp: u64 },

    #[error("price {price} below target {unlock_price}")]
    BelowTarget { price: i128, unlock_price: u128 },

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(unlock_timestamp: u64, unlock_price: u128) -> ReleaseCondition {
        ReleaseCondition {
            unlock_timestamp,
            unlock_price,
        }
    }

    #[test]
    fn both_halves_hold() {
        assert_eq!(at(100, 1_800).verify(100, || Ok(1_900)), Ok(()));
        assert_eq!(at(100, 1_900).verify(250, || Ok(1_900)), Ok(()));
    }

    #[test]
    fn time_lock_checked_first() {
        // the feed must not be read while the time lock is closed
        let cond = at(100, 0);
        let res = cond.verify(99, || panic!("price read before unlock"));
        assert_eq!(
            res,
            Err(Error::TimeLocked {
                now: 99,
                unlock_timestamp: 100
            })
        );
    }

    #[test]
    fn below_target() {
        assert_eq!(
            at(0, 2_000).verify(0, || Ok(1_900)),
            Err(Error::BelowTarget {
                price: 1_900,
                unlock_price: 2_000
            })
        );
    }

    #[test]
    fn zero_target_still_reads_feed() {
        let cond = at(0, 0);
        assert_eq!(cond.verify(0, || Ok(1)), Ok(()));
        assert_eq!(
            cond.verify(0, || Err(OracleError::Unavailable("down".into()))),
            Err(Error::Oracle(OracleError::Unavailable("down".into())))
        );
    }

    #[test]
    fn negative_price_never_reaches_target() {
        assert!(!at(0, 0).price_reached(-1));
        assert!(at(0, 0).price_reached(0));
    }

    #[test]
    fn unlock_overflow() {
        assert_eq!(ReleaseCondition::after(10, 86_400, 5), Some(at(86_410, 5)));
        assert_eq!(ReleaseCondition::after(u64::MAX, 1, 5), None);
    }
}
