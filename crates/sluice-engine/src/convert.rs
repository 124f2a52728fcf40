//! Conversion of vested entitlements into the external time-lock.
//!
//! Instead of waiting out the vesting schedule, a recipient can pair their
//! unwithdrawn remainder with an equal nominal amount of the pair asset,
//! swap the paired cost through the external router under a slippage floor,
//! and deposit the combined value into the external time-lock. Conversion
//! bypasses the exit penalty but is terminal for the entitlement record.

use tracing::{debug, info};

use sluice_core::constants::{BPS, KEEP_CURRENT_LOCK, SLIPPAGE_FLOOR_BPS};
use sluice_core::error::DistributionError;
use sluice_core::types::{mul_div, AccountId, Amount, AssetId, PeriodId, Timestamp};

use crate::engine::DistributionEngine;

/// How the locked value lands in the time-lock service.
enum LockPlan {
    Create(Timestamp),
    Increase(Option<Timestamp>),
}

impl DistributionEngine {
    /// Convert up to the entitlement's unwithdrawn remainder into the
    /// external time-lock. Returns the total amount deposited into the lock.
    ///
    /// `lock_until` of [`KEEP_CURRENT_LOCK`] preserves an existing lock's
    /// unlock time, which must itself retain the minimum runway.
    pub fn convert(
        &self,
        account: AccountId,
        id: PeriodId,
        primary_amount: Amount,
        min_slippage_bps: u32,
        lock_until: Timestamp,
    ) -> Result<Amount, DistributionError> {
        self.convert_many(account, &[id], primary_amount, min_slippage_bps, lock_until)
    }

    /// Convert across several vested periods in one lock deposit, drawing
    /// each period's remainder in order until `primary_amount` is covered.
    /// Every listed period is marked converted; any failure rejects the
    /// whole batch.
    pub fn convert_many(
        &self,
        account: AccountId,
        ids: &[PeriodId],
        primary_amount: Amount,
        min_slippage_bps: u32,
        lock_until: Timestamp,
    ) -> Result<Amount, DistributionError> {
        if primary_amount == 0 {
            return Err(DistributionError::EmptyAmount);
        }
        if !(SLIPPAGE_FLOOR_BPS..=BPS).contains(&min_slippage_bps) {
            return Err(DistributionError::SlippageParamInvalid(min_slippage_bps));
        }
        if ids.is_empty() {
            return Err(DistributionError::MismatchedInputs);
        }

        let now = self.clock.now();
        let config = self.engine_config();
        let mut store = self.store.write();

        // Stage per-period draws against the unwithdrawn remainders.
        let mut staged: Vec<(PeriodId, Amount)> = Vec::with_capacity(ids.len());
        let mut needed = primary_amount;
        let mut reward_asset: Option<AssetId> = None;
        for (i, &id) in ids.iter().enumerate() {
            if ids[..i].contains(&id) {
                return Err(DistributionError::Converted);
            }
            let period = store.period(id)?;
            period.vested()?;
            match reward_asset {
                None => reward_asset = Some(period.asset),
                // One lock deposit holds one asset.
                Some(asset) if asset != period.asset => {
                    return Err(DistributionError::MismatchedInputs)
                }
                Some(_) => {}
            }
            let ent = crate::engine::entitlement_for(&store, id, account)?;
            let convertible = ent.remaining();
            if convertible == 0 {
                return Err(DistributionError::EmptyWithdraw);
            }
            let draw = convertible.min(needed);
            needed -= draw;
            staged.push((id, draw));
        }
        if needed > 0 {
            return Err(DistributionError::AmountExceedsWithdrawable {
                requested: primary_amount,
                available: primary_amount - needed,
            });
        }
        let reward_asset = reward_asset.ok_or(DistributionError::MismatchedInputs)?;

        // Lock window validation against the account's existing lock.
        let existing = self.locker.lock_state_of(account)?;
        let plan = if lock_until == KEEP_CURRENT_LOCK {
            match existing {
                None => return Err(DistributionError::LockDurationOutOfRange),
                Some(lock) => {
                    if lock.unlock_time.saturating_sub(now) < config.min_lock_duration {
                        return Err(DistributionError::LockDurationOutOfRange);
                    }
                    LockPlan::Increase(None)
                }
            }
        } else {
            let duration = lock_until.saturating_sub(now);
            if duration < config.min_lock_duration || duration > config.max_lock_duration {
                return Err(DistributionError::LockDurationOutOfRange);
            }
            match existing {
                Some(_) => LockPlan::Increase(Some(lock_until)),
                None => LockPlan::Create(lock_until),
            }
        };

        // External phase: pull the pair-asset cost, swap it under the floor,
        // deposit everything into the lock. Nothing commits until all three
        // outcomes are in hand.
        let cost = self
            .accountant
            .collect(config.pair_asset, account, primary_amount, 1)?;
        let floor = mul_div(primary_amount, min_slippage_bps as Amount, BPS as Amount)?;
        let swapped = self
            .router
            .swap(config.pair_asset, cost, reward_asset, floor)
            .map_err(|_| DistributionError::SlippageExceeded)?;
        let lock_amount = primary_amount
            .checked_add(swapped)
            .ok_or(DistributionError::ArithmeticOverflow)?;
        match plan {
            LockPlan::Create(unlock_time) => {
                self.locker.create_lock(account, lock_amount, unlock_time)?
            }
            LockPlan::Increase(new_unlock) => {
                self.locker.increase_lock(account, lock_amount, new_unlock)?
            }
        }

        // Commit: every listed entitlement becomes terminal.
        for (id, draw) in staged {
            let ent = store
                .entitlement_mut(id, account)
                .ok_or(DistributionError::EmptyWithdraw)?;
            ent.withdrawn = ent
                .withdrawn
                .checked_add(draw)
                .ok_or(DistributionError::ArithmeticOverflow)?;
            ent.converted = true;
            debug!(period = id, account = %account, amount = %draw, "converted entitlement");
        }
        info!(account = %account, locked = %lock_amount, "deposited conversion into time-lock");
        Ok(lock_amount)
    }
}
