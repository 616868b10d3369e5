//! Escrow engine and its front-ends.
//!
//! [`Locker`] holds the ledger, the price feeds and the transfer and clock
//! collaborators. The asset policy `P` narrows which kind of deposit a
//! front-end accepts:
//!
//! - [`CoinLocker`] accepts native coin or any token per deposit,
//! - [`TokenLocker`] accepts tokens only,
//! - [`NativeLocker`] accepts native coin only, against one fixed feed.
//!
//! Redemption and every read are shared by all three.

use tracing::{debug, info, instrument, warn};

use crate::asset::{validate_funding, Asset, AssetKind};
use crate::clock::Clock;
use crate::condition::ReleaseCondition;
use crate::config::{ConfigError, LockerConfig};
use crate::deposit::{Deposit, DepositId};
use crate::error::{EscrowError, ValidationError};
use crate::identity::Address;
use crate::ledger::{Ledger, NewDeposit};
use crate::oracle::{PriceFeeds, PriceOracle};
use crate::transfer::AssetTransfer;
use crate::Result;

/// Which asset kinds a front-end accepts.
pub trait AssetPolicy {
    /// Kind of deposit requested with `token` (the zero address for none).
    fn kind_of(&self, token: &Address) -> AssetKind;

    /// Rejection for a native deposit with no value attached.
    fn missing_value(&self) -> ValidationError;
}

/// Native coin when no token is given, a token deposit otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyAsset;

impl AssetPolicy for AnyAsset {
    fn kind_of(&self, token: &Address) -> AssetKind {
        if token.is_zero() {
            AssetKind::Native
        } else {
            AssetKind::Token
        }
    }

    fn missing_value(&self) -> ValidationError {
        ValidationError::NativeDepositRequired
    }
}

/// Token deposits only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOnly;

impl AssetPolicy for TokenOnly {
    fn kind_of(&self, _token: &Address) -> AssetKind {
        AssetKind::Token
    }

    fn missing_value(&self) -> ValidationError {
        ValidationError::NativeDepositRequired
    }
}

/// Native deposits only, all priced by one feed.
#[derive(Debug, Clone, Copy)]
pub struct NativeOnly {
    pub price_feed: Address,
}

impl AssetPolicy for NativeOnly {
    fn kind_of(&self, _token: &Address) -> AssetKind {
        AssetKind::Native
    }

    fn missing_value(&self) -> ValidationError {
        ValidationError::NoNativeValueSent
    }
}

/// Locker accepting either asset kind per deposit.
pub type CoinLocker<T, C> = Locker<AnyAsset, T, C>;

/// Locker accepting token deposits only.
pub type TokenLocker<T, C> = Locker<TokenOnly, T, C>;

/// Locker accepting native deposits only.
pub type NativeLocker<T, C> = Locker<NativeOnly, T, C>;

/// A funding request after the front-end has filled in its fixed parts.
struct Funding {
    price_feed: Address,
    token: Address,
    amount: u128,
    lock_days: u64,
    unlock_price: u128,
    attached_value: u128,
}

/// Time- and price-gated escrow over a [`Ledger`].
pub struct Locker<P, T, C> {
    policy: P,
    config: LockerConfig,
    ledger: Ledger,
    feeds: PriceFeeds,
    transfer: T,
    clock: C,
}

impl<P, T, C> Locker<P, T, C>
where
    P: AssetPolicy,
    T: AssetTransfer,
    C: Clock,
{
    /// An empty locker with the default configuration.
    pub fn with_policy(policy: P, transfer: T, clock: C) -> Self {
        Self {
            policy,
            config: LockerConfig::default(),
            ledger: Ledger::new(),
            feeds: PriceFeeds::new(),
            transfer,
            clock,
        }
    }

    /// Replaces the configuration after checking it.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from [`LockerConfig::validate`].
    pub fn with_config(mut self, config: LockerConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Replaces the ledger, e.g. with one restored by [`Ledger::from_bytes`].
    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Makes `oracle` available to deposits under `feed`.
    pub fn register_price_feed<O>(
        &mut self,
        feed: Address,
        oracle: O,
    ) -> Option<Box<dyn PriceOracle>>
    where
        O: PriceOracle + 'static,
    {
        debug!(%feed, "registering price feed");
        self.feeds.register(feed, oracle)
    }

    pub fn config(&self) -> &LockerConfig {
        &self.config
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn price_feeds(&self) -> &PriceFeeds {
        &self.feeds
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    pub fn transfer_mut(&mut self) -> &mut T {
        &mut self.transfer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Snapshot of the ledger, see [`Ledger::to_bytes`].
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        self.ledger.to_bytes()
    }

    /// Looks up a deposit.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NotFound`] if `id` was never allocated.
    pub fn get_deposit(&self, id: DepositId) -> Result<&Deposit> {
        self.ledger.get(id)
    }

    /// Ids created by `depositor`, oldest first.
    pub fn get_user_deposits(&self, depositor: &Address) -> &[DepositId] {
        self.ledger.deposits_of(depositor)
    }

    /// Amount of `asset` currently held for unredeemed deposits.
    pub fn total_locked(&self, asset: &Asset) -> u128 {
        self.ledger.total_locked(asset)
    }

    /// Runs every redemption check without changing state or moving funds.
    pub fn can_redeem(&self, caller: &Address, id: DepositId) -> Result<()> {
        self.check_redeemable(caller, id).map(|_| ())
    }

    /// Releases deposit `id` to its depositor and returns the amount paid.
    ///
    /// The deposit is marked redeemed before the credit is attempted. If the
    /// credit fails the mark is rolled back and the error returned, so the
    /// deposit stays locked and can be redeemed again later.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::NotFound`] for an unknown id,
    /// - [`EscrowError::Unauthorized`] if `caller` is not the depositor,
    /// - [`EscrowError::AlreadyRedeemed`] on a second redemption,
    /// - [`EscrowError::NotRedeemable`] while the time lock is closed or the
    ///   price is below target,
    /// - [`EscrowError::Oracle`] if the feed gives no usable price,
    /// - [`EscrowError::Transfer`] if the payout fails.
    #[instrument(skip_all, fields(%caller, %id))]
    pub fn redeem_deposit(&mut self, caller: Address, id: DepositId) -> Result<u128> {
        let (asset, amount) = self.check_redeemable(&caller, id)?;

        self.ledger.mark_redeemed(id)?;
        if let Err(e) = self.transfer.credit(&caller, &asset, amount) {
            warn!(error = %e, "payout failed, deposit stays locked");
            self.ledger.revert_redeemed(id)?;
            return Err(e.into());
        }

        info!(%asset, %amount, "deposit redeemed");
        Ok(amount)
    }

    fn check_redeemable(&self, caller: &Address, id: DepositId) -> Result<(Asset, u128)> {
        let deposit = self.ledger.get(id)?;
        if deposit.depositor != *caller {
            debug!(depositor = %deposit.depositor, "caller is not the depositor");
            return Err(EscrowError::Unauthorized);
        }
        if deposit.redeemed {
            debug!("deposit already redeemed");
            return Err(EscrowError::AlreadyRedeemed);
        }

        let now = self.clock.now();
        deposit
            .condition
            .verify(now, || {
                self.feeds
                    .current_price(&deposit.price_feed, now, self.config.max_price_age)
            })
            .map_err(|e| {
                debug!(reason = %e, "release condition not met");
                EscrowError::from(e)
            })?;

        Ok((deposit.asset, deposit.amount))
    }

    /// Validates, debits the caller, then records the deposit.
    fn open(&mut self, caller: Address, funding: Funding) -> Result<DepositId> {
        let kind = self.policy.kind_of(&funding.token);
        let (asset, amount) = validate_funding(
            kind,
            funding.token,
            funding.amount,
            funding.attached_value,
            self.policy.missing_value(),
        )
        .inspect_err(|e| debug!(reason = %e, "deposit rejected"))?;

        if !self.feeds.contains(&funding.price_feed) {
            debug!(feed = %funding.price_feed, "deposit rejected: unknown price feed");
            return Err(ValidationError::UnknownPriceFeed(funding.price_feed).into());
        }

        let now = self.clock.now();
        let condition = self
            .config
            .lock_seconds(funding.lock_days)
            .and_then(|secs| ReleaseCondition::after(now, secs, funding.unlock_price))
            .ok_or(ValidationError::LockTooLong(funding.lock_days))?;

        self.transfer
            .debit(&caller, &asset, amount)
            .inspect_err(|e| debug!(reason = %e, "deposit rejected: debit failed"))?;

        let id = self.ledger.insert(NewDeposit {
            depositor: caller,
            asset,
            price_feed: funding.price_feed,
            amount,
            condition,
            created_at: now,
        })?;

        info!(
            %id,
            %asset,
            %amount,
            unlock_timestamp = condition.unlock_timestamp,
            unlock_price = %condition.unlock_price,
            "deposit created"
        );
        Ok(id)
    }
}

impl<T: AssetTransfer, C: Clock> Locker<AnyAsset, T, C> {
    pub fn new(transfer: T, clock: C) -> Self {
        Self::with_policy(AnyAsset, transfer, clock)
    }

    /// Locks native coin (`token` is [`Address::ZERO`]) or a token.
    ///
    /// For native deposits the locked amount is `attached_value` and
    /// `amount` is ignored. Token deposits must not carry native value.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(%caller, %price_feed, %token))]
    pub fn create_deposit(
        &mut self,
        caller: Address,
        price_feed: Address,
        token: Address,
        amount: u128,
        lock_days: u64,
        unlock_price: u128,
        attached_value: u128,
    ) -> Result<DepositId> {
        self.open(
            caller,
            Funding {
                price_feed,
                token,
                amount,
                lock_days,
                unlock_price,
                attached_value,
            },
        )
    }
}

impl<T: AssetTransfer, C: Clock> Locker<TokenOnly, T, C> {
    pub fn new(transfer: T, clock: C) -> Self {
        Self::with_policy(TokenOnly, transfer, clock)
    }

    /// Pulls `amount` of `token` from `caller` through its allowance.
    #[instrument(skip_all, fields(%caller, %price_feed, %token))]
    pub fn create_deposit(
        &mut self,
        caller: Address,
        price_feed: Address,
        token: Address,
        amount: u128,
        lock_days: u64,
        unlock_price: u128,
    ) -> Result<DepositId> {
        self.open(
            caller,
            Funding {
                price_feed,
                token,
                amount,
                lock_days,
                unlock_price,
                attached_value: 0,
            },
        )
    }
}

impl<T: AssetTransfer, C: Clock> Locker<NativeOnly, T, C> {
    /// A native-only locker priced by `oracle`, registered as `price_feed`.
    pub fn new<O>(price_feed: Address, oracle: O, transfer: T, clock: C) -> Self
    where
        O: PriceOracle + 'static,
    {
        let mut locker = Self::with_policy(NativeOnly { price_feed }, transfer, clock);
        locker.register_price_feed(price_feed, oracle);
        locker
    }

    /// Locks the value attached to the call.
    #[instrument(skip_all, fields(%caller))]
    pub fn create_deposit(
        &mut self,
        caller: Address,
        lock_days: u64,
        unlock_price: u128,
        attached_value: u128,
    ) -> Result<DepositId> {
        let price_feed = self.policy.price_feed;
        self.open(
            caller,
            Funding {
                price_feed,
                token: Address::ZERO,
                amount: 0,
                lock_days,
                unlock_price,
                attached_value,
            },
        )
    }
}

impl<P: std::fmt::Debug, T, C> std::fmt::Debug for Locker<P, T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locker")
            .field("policy", &self.policy)
            .field("config", &self.config)
            .field("deposits", &self.ledger.len())
            .field("feeds", &self.feeds)
            .finish_non_exhaustive()
    }
}
