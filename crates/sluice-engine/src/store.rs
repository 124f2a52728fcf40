//! In-memory state of the distribution engine.
//!
//! Periods live in an arena indexed by their monotonically assigned id;
//! entitlement records live in a hash map keyed by `(period, account)`.
//! This is the only state the engine must durably retain; the whole store
//! encodes with bincode for snapshotting.
//!
//! Not thread-safe on its own; the engine wraps it in a `RwLock` and
//! serializes every mutation (see [`DistributionEngine`](crate::engine::DistributionEngine)).

use std::collections::HashMap;

use sluice_core::error::DistributionError;
use sluice_core::types::{
    AccountEntitlement, AccountId, Amount, AssetId, DistributionPeriod, PeriodId,
};

/// Arena of periods plus the entitlement and fee-pool maps.
#[derive(Debug, Default, bincode::Encode, bincode::Decode)]
pub struct DistributionStore {
    /// Period arena; `periods[i]` has id `i + 1`.
    periods: Vec<DistributionPeriod>,
    /// One record per credited `(period, account)` pair. Append-only.
    entitlements: HashMap<(PeriodId, AccountId), AccountEntitlement>,
    /// Per-asset tax accrued by settlements and not yet swept.
    fee_pools: HashMap<AssetId, Amount>,
}

impl DistributionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next pushed period will carry.
    pub fn next_period_id(&self) -> PeriodId {
        self.periods.len() as PeriodId + 1
    }

    /// Append a period to the arena. The caller assigns
    /// [`next_period_id`](Self::next_period_id) before construction.
    pub fn push_period(&mut self, period: DistributionPeriod) {
        debug_assert_eq!(period.id, self.next_period_id());
        self.periods.push(period);
    }

    pub fn period_count(&self) -> u64 {
        self.periods.len() as u64
    }

    pub fn period(&self, id: PeriodId) -> Result<&DistributionPeriod, DistributionError> {
        id.checked_sub(1)
            .and_then(|i| self.periods.get(i as usize))
            .ok_or(DistributionError::UnknownPeriod(id))
    }

    pub fn period_mut(
        &mut self,
        id: PeriodId,
    ) -> Result<&mut DistributionPeriod, DistributionError> {
        id.checked_sub(1)
            .and_then(|i| self.periods.get_mut(i as usize))
            .ok_or(DistributionError::UnknownPeriod(id))
    }

    pub fn entitlement(&self, id: PeriodId, account: AccountId) -> Option<&AccountEntitlement> {
        self.entitlements.get(&(id, account))
    }

    pub fn entitlement_mut(
        &mut self,
        id: PeriodId,
        account: AccountId,
    ) -> Option<&mut AccountEntitlement> {
        self.entitlements.get_mut(&(id, account))
    }

    /// Create the entitlement record for `(id, account)`.
    ///
    /// Fails with [`AlreadyProcessed`](DistributionError::AlreadyProcessed)
    /// if a record exists; this is the exactly-once crediting guard.
    pub fn insert_entitlement(
        &mut self,
        id: PeriodId,
        account: AccountId,
        entitlement: AccountEntitlement,
    ) -> Result<(), DistributionError> {
        match self.entitlements.entry((id, account)) {
            std::collections::hash_map::Entry::Occupied(_) => {
                Err(DistributionError::AlreadyProcessed)
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(entitlement);
                Ok(())
            }
        }
    }

    /// Accrue settled tax into the per-asset fee pool.
    pub fn accrue_fee(&mut self, asset: AssetId, amount: Amount) {
        if amount > 0 {
            *self.fee_pools.entry(asset).or_default() += amount;
        }
    }

    pub fn fee_pool(&self, asset: AssetId) -> Amount {
        *self.fee_pools.get(&asset).unwrap_or(&0)
    }

    /// Drain the fee pool for `asset`, returning what was accrued.
    pub fn take_fees(&mut self, asset: AssetId) -> Amount {
        self.fee_pools.remove(&asset).unwrap_or(0)
    }
}
