//! Price-feed integration.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::identity::Address;

/// Latest answer of a price feed, in the feed's own unit.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct PriceReading {
    pub price: i128,
    /// Unix time (seconds) at which the feed last updated.
    pub updated_at: u64,
}

/// Source of a reference price.
///
/// Implementors wrap an external feed (e.g., a Chainlink aggregator) and
/// report its latest answer without rescaling.
pub trait PriceOracle: Send + Sync {
    /// Latest known reading.
    fn latest_price(&self) -> Result<PriceReading, OracleError>;
}

impl<O: PriceOracle + ?Sized> PriceOracle for Box<O> {
    fn latest_price(&self) -> Result<PriceReading, OracleError> {
        (**self).latest_price()
    }
}

impl<O: PriceOracle + ?Sized> PriceOracle for std::sync::Arc<O> {
    fn latest_price(&self) -> Result<PriceReading, OracleError> {
        (**self).latest_price()
    }
}

/// Registry of price feeds addressable by deposits.
#[derive(Default)]
pub struct PriceFeeds {
    feeds: BTreeMap<Address, Box<dyn PriceOracle>>,
}

impl PriceFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `oracle` under `feed`, returning the oracle it replaced.
    pub fn register<O>(&mut self, feed: Address, oracle: O) -> Option<Box<dyn PriceOracle>>
    where
        O: PriceOracle + 'static,
    {
        self.feeds.insert(feed, Box::new(oracle))
    }

    pub fn contains(&self, feed: &Address) -> bool {
        self.feeds.contains_key(feed)
    }

    /// Addresses of all registered feeds, in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.feeds.keys()
    }

    /// Reads `feed` and returns a usable price.
    ///
    /// A reading that is not strictly positive, or older than `max_age`
    /// seconds when a maximum age is given, is rejected.
    pub fn current_price(
        &self,
        feed: &Address,
        now: u64,
        max_age: Option<u64>,
    ) -> Result<i128, OracleError> {
        let oracle = self.feeds.get(feed).ok_or(OracleError::UnknownFeed(*feed))?;
        let reading = oracle.latest_price()?;

        if reading.price <= 0 {
            return Err(OracleError::NonPositivePrice(reading.price));
        }
        if let Some(max_age) = max_age {
            if now.saturating_sub(reading.updated_at) > max_age {
                return Err(OracleError::Stale {
                    updated_at: reading.updated_at,
                    now,
                    max_age,
                });
            }
        }
        Ok(reading.price)
    }
}

impl std::fmt::Debug for PriceFeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.feeds.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FixedPriceOracle;

    const FEED: Address = Address([9u8; 20]);

    #[test]
    fn reads_registered_feed() {
        let mut feeds = PriceFeeds::new();
        assert!(feeds.register(FEED, FixedPriceOracle::new(1900)).is_none());
        assert!(feeds.contains(&FEED));
        assert_eq!(feeds.current_price(&FEED, 0, None), Ok(1900));
        assert_eq!(feeds.addresses().collect::<Vec<_>>(), vec![&FEED]);
    }

    #[test]
    fn unknown_feed() {
        let feeds = PriceFeeds::new();
        assert_eq!(
            feeds.current_price(&FEED, 0, None),
            Err(OracleError::UnknownFeed(FEED))
        );
    }

    #[test]
    fn rejects_non_positive_and_stale() {
        let oracle = FixedPriceOracle::new(0);
        let mut feeds = PriceFeeds::new();
        feeds.register(FEED, oracle.clone());
        assert_eq!(
            feeds.current_price(&FEED, 0, None),
            Err(OracleError::NonPositivePrice(0))
        );

        oracle.set(PriceReading {
            price: 1900,
            updated_at: 1_000,
        });
        assert_eq!(feeds.current_price(&FEED, 4_600, Some(3_600)), Ok(1900));
        assert_eq!(
            feeds.current_price(&FEED, 4_601, Some(3_600)),
            Err(OracleError::Stale {
                updated_at: 1_000,
                now: 4_601,
                max_age: 3_600,
            })
        );
        // no maximum age configured
        assert_eq!(feeds.current_price(&FEED, u64::MAX, None), Ok(1900));
    }

    #[test]
    fn propagates_feed_failure() {
        let oracle = FixedPriceOracle::new(1900);
        oracle.fail("round not complete");
        let mut feeds = PriceFeeds::new();
        feeds.register(FEED, oracle);
        assert_eq!(
            feeds.current_price(&FEED, 0, None),
            Err(OracleError::Unavailable("round not complete".into()))
        );
    }
}
