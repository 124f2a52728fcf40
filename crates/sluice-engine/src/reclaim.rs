//! Reclamation: returning undistributed, expired, and forfeited value.
//!
//! Three flows, all idempotent in spirit but with different repeat
//! semantics:
//! - vested recovery and penalty sweeps move whatever delta has accrued and
//!   treat "nothing to move" as a successful no-op, so callers can repeat
//!   them freely;
//! - immediate recycling fails `InvalidAmount` when a period has nothing
//!   left, so a duplicate recycle is distinguishable from a fresh one;
//! - fee sweeps fail `InsufficientFunds` when the pool is empty.

use tracing::info;

use sluice_core::error::DistributionError;
use sluice_core::types::{AccountId, Amount, AssetId, PeriodId};

use crate::engine::DistributionEngine;

impl DistributionEngine {
    /// Recover the never-credited remainder of expired vested periods:
    /// `total - credited_total`, less anything already recovered.
    ///
    /// Operator-only; each period must be past `expire_time +
    /// reclaim_window`. Periods with nothing left are skipped, so repeating
    /// the call moves zero and succeeds. Returns the total moved.
    pub fn recover_expired(
        &self,
        caller: AccountId,
        ids: &[PeriodId],
    ) -> Result<Amount, DistributionError> {
        self.require_operator(caller)?;
        let now = self.clock.now();
        let mut store = self.store.write();

        let mut staged: Vec<(PeriodId, AssetId, Amount)> = Vec::new();
        for &id in ids {
            let period = store.period(id)?;
            let terms = period.vested()?;
            if now < period.expire_time.saturating_add(terms.reclaim_window) {
                return Err(DistributionError::NotEnded);
            }
            let already: Amount = staged_amount(&staged, id);
            let available = period
                .total
                .saturating_sub(terms.credited_total)
                .saturating_sub(terms.expired_withdrawn)
                .saturating_sub(already);
            if available > 0 {
                staged.push((id, period.asset, available));
            }
        }

        let mut moved: Amount = 0;
        for &(_, asset, amount) in &staged {
            moved += self.accountant.disburse(asset, caller, amount, 1)?;
        }
        for (id, _, amount) in staged {
            let terms = store.period_mut(id)?.vested_mut()?;
            terms.expired_withdrawn = terms
                .expired_withdrawn
                .checked_add(amount)
                .ok_or(DistributionError::ArithmeticOverflow)?;
            info!(period = id, amount = %amount, "recovered expired remainder");
        }
        Ok(moved)
    }

    /// Sweep accrued exit penalties from vested periods:
    /// `penalty_total - penalty_withdrawn` per period.
    ///
    /// Operator-only, no time gate. Periods with nothing accrued are
    /// skipped; repeating the call moves zero and succeeds. Returns the
    /// total moved.
    pub fn sweep_penalties(
        &self,
        caller: AccountId,
        ids: &[PeriodId],
    ) -> Result<Amount, DistributionError> {
        self.require_operator(caller)?;
        let mut store = self.store.write();

        let mut staged: Vec<(PeriodId, AssetId, Amount)> = Vec::new();
        for &id in ids {
            let period = store.period(id)?;
            let terms = period.vested()?;
            let already = staged_amount(&staged, id);
            let available = terms
                .penalty_total
                .saturating_sub(terms.penalty_withdrawn)
                .saturating_sub(already);
            if available > 0 {
                staged.push((id, period.asset, available));
            }
        }

        let mut moved: Amount = 0;
        for &(_, asset, amount) in &staged {
            moved += self.accountant.disburse(asset, caller, amount, 1)?;
        }
        for (id, _, amount) in staged {
            let terms = store.period_mut(id)?.vested_mut()?;
            terms.penalty_withdrawn = terms
                .penalty_withdrawn
                .checked_add(amount)
                .ok_or(DistributionError::ArithmeticOverflow)?;
            info!(period = id, amount = %amount, "swept exit penalties");
        }
        Ok(moved)
    }

    /// Recycle an immediate period's leftover value back to its provider.
    pub fn recycle(&self, caller: AccountId, id: PeriodId) -> Result<Amount, DistributionError> {
        self.recycle_many(caller, &[id])
    }

    /// Recycle several immediate periods at once.
    ///
    /// Per period: the undistributed figure is recyclable as soon as the
    /// settlement is recorded; once the claim window
    /// (`expire_time + reclaim_duration`) has passed, the unclaimed part of
    /// the claim allocation joins it. A period with nothing left fails the
    /// whole batch with `InvalidAmount`. Returns the total moved.
    pub fn recycle_many(
        &self,
        caller: AccountId,
        ids: &[PeriodId],
    ) -> Result<Amount, DistributionError> {
        let now = self.clock.now();
        let mut store = self.store.write();

        let mut staged: Vec<(PeriodId, AssetId, Amount)> = Vec::with_capacity(ids.len());
        for &id in ids {
            let period = store.period(id)?;
            let terms = period.immediate()?;
            if period.provider != caller {
                return Err(DistributionError::Unauthorized);
            }
            let settlement = terms.settlement.ok_or(DistributionError::NotStarted)?;

            let mut available = settlement.undistributed;
            if now >= period.expire_time.saturating_add(terms.reclaim_duration) {
                // Claim window over: the unclaimed allocation is forfeit.
                available = available
                    .checked_add(settlement.claim_allocation.saturating_sub(terms.claimed_total))
                    .ok_or(DistributionError::ArithmeticOverflow)?;
            }
            let already = staged_amount(&staged, id);
            available = available
                .saturating_sub(terms.recycled_total)
                .saturating_sub(already);
            if available == 0 {
                return Err(DistributionError::InvalidAmount);
            }
            staged.push((id, period.asset, available));
        }

        let mut moved: Amount = 0;
        for &(_, asset, amount) in &staged {
            moved += self.accountant.disburse(asset, caller, amount, 1)?;
        }
        for (id, _, amount) in staged {
            let terms = store.period_mut(id)?.immediate_mut()?;
            terms.recycled_total = terms
                .recycled_total
                .checked_add(amount)
                .ok_or(DistributionError::ArithmeticOverflow)?;
            info!(period = id, amount = %amount, "recycled leftover value");
        }
        Ok(moved)
    }

    /// Sweep the accrued tax pool of one asset to `to`. Operator-only;
    /// fails `InsufficientFunds` when nothing has accrued since the last
    /// sweep.
    pub fn sweep_fees(
        &self,
        caller: AccountId,
        asset: AssetId,
        to: AccountId,
    ) -> Result<Amount, DistributionError> {
        self.sweep_fees_many(caller, &[asset], to)
    }

    /// Sweep several assets' tax pools at once; an empty pool fails the
    /// whole batch.
    pub fn sweep_fees_many(
        &self,
        caller: AccountId,
        assets: &[AssetId],
        to: AccountId,
    ) -> Result<Amount, DistributionError> {
        self.require_operator(caller)?;
        let mut store = self.store.write();

        let mut staged: Vec<(AssetId, Amount)> = Vec::with_capacity(assets.len());
        for (i, &asset) in assets.iter().enumerate() {
            if assets[..i].contains(&asset) {
                return Err(DistributionError::InsufficientFunds);
            }
            let pool = store.fee_pool(asset);
            if pool == 0 {
                return Err(DistributionError::InsufficientFunds);
            }
            staged.push((asset, pool));
        }

        let mut moved: Amount = 0;
        for &(asset, amount) in &staged {
            moved += self.accountant.disburse(asset, to, amount, 1)?;
        }
        for (asset, amount) in staged {
            store.take_fees(asset);
            info!(asset = %asset, amount = %amount, "swept tax pool");
        }
        Ok(moved)
    }
}

/// Amount already staged for `id` earlier in the same batch.
fn staged_amount(staged: &[(PeriodId, AssetId, Amount)], id: PeriodId) -> Amount {
    staged
        .iter()
        .filter(|(sid, _, _)| *sid == id)
        .map(|(_, _, amount)| *amount)
        .sum()
}
