//! Distribution engine composition and operation surface.
//!
//! [`DistributionEngine`] wires the store, the drift accountant, and the
//! external collaborators (asset ledger, swap router, time-lock, roles,
//! clock) into the single entry point for every state transition. The host
//! system linearizes calls; internally the store sits behind a write lock
//! and each mutating operation validates, performs its external movements,
//! and commits bookkeeping as one critical section. A failed call leaves
//! no partial state behind.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use sluice_core::commitment;
use sluice_core::constants::{BPS, MAX_LOCK_DURATION, MIN_LOCK_DURATION};
use sluice_core::error::DistributionError;
use sluice_core::traits::{
    AssetLedger, Clock, LockService, RoleOracle, SwapRouter, UnlockCalculator,
};
use sluice_core::types::{
    AccountEntitlement, AccountId, Amount, AssetId, DistributionPeriod, ExitQuote, Hash256,
    ImmediateSpec, ImmediateTerms, PeriodId, PeriodTerms, Settlement, Timestamp, VestedSpec,
    VestedTerms,
};
use sluice_vesting::LinearUnlock;

use crate::store::DistributionStore;
use crate::transfer::DriftAccountant;

/// Runtime configuration of the conversion adapter.
///
/// Periods carry their own windows and penalty terms; this only covers the
/// cross-period conversion parameters the operator may retune.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Asset the recipient pays with when converting into the time-lock.
    pub pair_asset: AssetId,
    /// Shortest accepted remaining lock duration.
    pub min_lock_duration: u64,
    /// Longest accepted lock duration.
    pub max_lock_duration: u64,
}

impl EngineConfig {
    pub fn new(pair_asset: AssetId) -> Self {
        Self {
            pair_asset,
            min_lock_duration: MIN_LOCK_DURATION,
            max_lock_duration: MAX_LOCK_DURATION,
        }
    }

    fn validate(&self) -> Result<(), DistributionError> {
        if self.min_lock_duration == 0 || self.min_lock_duration >= self.max_lock_duration {
            return Err(DistributionError::ConfigIncomplete("lock duration bounds"));
        }
        Ok(())
    }
}

/// The distribution engine: period registry, entitlement ledger, and
/// reclamation accountant behind one linearized surface.
pub struct DistributionEngine {
    pub(crate) store: RwLock<DistributionStore>,
    pub(crate) accountant: DriftAccountant,
    pub(crate) router: Arc<dyn SwapRouter>,
    pub(crate) locker: Arc<dyn LockService>,
    pub(crate) roles: Arc<dyn RoleOracle>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) unlock: Arc<dyn UnlockCalculator>,
    pub(crate) config: RwLock<EngineConfig>,
}

impl DistributionEngine {
    /// Compose an engine over the given collaborators.
    ///
    /// `treasury` is the engine's own holder account on the asset ledger;
    /// all drift measurements are taken against it.
    pub fn new(
        ledger: Arc<dyn AssetLedger>,
        router: Arc<dyn SwapRouter>,
        locker: Arc<dyn LockService>,
        roles: Arc<dyn RoleOracle>,
        clock: Arc<dyn Clock>,
        treasury: AccountId,
        config: EngineConfig,
    ) -> Result<Self, DistributionError> {
        config.validate()?;
        Ok(Self {
            store: RwLock::new(DistributionStore::new()),
            accountant: DriftAccountant::new(ledger, treasury),
            router,
            locker,
            roles,
            clock,
            unlock: Arc::new(LinearUnlock::new()),
            config: RwLock::new(config),
        })
    }

    /// Replace the unlock calculator (defaults to [`LinearUnlock`]).
    pub fn with_calculator(mut self, unlock: Arc<dyn UnlockCalculator>) -> Self {
        self.unlock = unlock;
        self
    }

    pub(crate) fn require_operator(&self, caller: AccountId) -> Result<(), DistributionError> {
        if self.roles.is_operator(caller) {
            Ok(())
        } else {
            Err(DistributionError::Unauthorized)
        }
    }

    // ------------------------------------------------------------------
    // Period lifecycle
    // ------------------------------------------------------------------

    /// Open a vested period. Operator-only; the commitment root must be known
    /// up front since crediting starts with the window.
    pub fn open_vested_period(
        &self,
        caller: AccountId,
        spec: VestedSpec,
    ) -> Result<PeriodId, DistributionError> {
        self.require_operator(caller)?;
        let now = self.clock.now();
        check_window(spec.start_time, spec.expire_time, now)?;
        if spec.commitment_root.is_zero() {
            return Err(DistributionError::ConfigIncomplete("commitment root"));
        }
        if spec.vest_duration == 0 {
            return Err(DistributionError::ConfigIncomplete("vest duration"));
        }
        if spec.penalty_base_bps as u64 + spec.penalty_add_bps as u64 > BPS as u64 {
            return Err(DistributionError::ConfigIncomplete("penalty rates"));
        }
        if spec.total == 0 {
            return Err(DistributionError::EmptyAmount);
        }

        let mut store = self.store.write();
        let received = self
            .accountant
            .collect(spec.asset, caller, spec.total, 1)?;
        let id = store.next_period_id();
        store.push_period(DistributionPeriod {
            id,
            asset: spec.asset,
            provider: caller,
            commitment_root: spec.commitment_root,
            total: received,
            start_time: spec.start_time,
            expire_time: spec.expire_time,
            terms: PeriodTerms::Vested(VestedTerms {
                vest_duration: spec.vest_duration,
                penalty_base_bps: spec.penalty_base_bps,
                penalty_add_bps: spec.penalty_add_bps,
                reclaim_window: spec.reclaim_window,
                credited_total: 0,
                penalty_total: 0,
                penalty_withdrawn: 0,
                expired_withdrawn: 0,
            }),
        });
        info!(period = id, total = %received, "opened vested period");
        Ok(id)
    }

    /// Open an immediate period (tranche). Any account may fund one and
    /// becomes its provider; the commitment root is deferred to settlement.
    pub fn open_immediate_period(
        &self,
        caller: AccountId,
        spec: ImmediateSpec,
    ) -> Result<PeriodId, DistributionError> {
        let now = self.clock.now();
        check_window(spec.start_time, spec.expire_time, now)?;
        // Immediate campaigns cannot start in the past: settlement counts on
        // the full window being observable.
        if spec.start_time < now {
            return Err(DistributionError::InvalidWindow {
                start: spec.start_time,
                expire: spec.expire_time,
            });
        }
        if spec.reclaim_duration == 0 {
            return Err(DistributionError::ConfigIncomplete("reclaim duration"));
        }
        if spec.total == 0 {
            return Err(DistributionError::EmptyAmount);
        }

        let mut store = self.store.write();
        let received = self
            .accountant
            .collect(spec.asset, caller, spec.total, 1)?;
        let id = store.next_period_id();
        store.push_period(DistributionPeriod {
            id,
            asset: spec.asset,
            provider: caller,
            commitment_root: Hash256::ZERO,
            total: received,
            start_time: spec.start_time,
            expire_time: spec.expire_time,
            terms: PeriodTerms::Immediate(ImmediateTerms {
                reclaim_duration: spec.reclaim_duration,
                settlement: None,
                claimed_total: 0,
                recycled_total: 0,
            }),
        });
        info!(period = id, total = %received, "opened immediate period");
        Ok(id)
    }

    /// Replace an immediate period's window and optionally top up its total.
    /// Provider-only, and only before the period starts.
    pub fn update_period(
        &self,
        caller: AccountId,
        id: PeriodId,
        new_start: Timestamp,
        new_expire: Timestamp,
        extra: Amount,
    ) -> Result<(), DistributionError> {
        let now = self.clock.now();
        let mut store = self.store.write();

        let period = store.period(id)?;
        period.immediate()?;
        if period.provider != caller {
            return Err(DistributionError::Unauthorized);
        }
        if now >= period.start_time {
            return Err(DistributionError::AlreadyStarted);
        }
        check_window(new_start, new_expire, now)?;
        if new_start < now {
            return Err(DistributionError::InvalidWindow {
                start: new_start,
                expire: new_expire,
            });
        }
        let asset = period.asset;

        let received = if extra > 0 {
            self.accountant.collect(asset, caller, extra, 1)?
        } else {
            0
        };

        let period = store.period_mut(id)?;
        period.start_time = new_start;
        period.expire_time = new_expire;
        period.total = period
            .total
            .checked_add(received)
            .ok_or(DistributionError::ArithmeticOverflow)?;
        info!(period = id, extra = %received, "updated immediate period");
        Ok(())
    }

    /// Record an immediate period's settlement: the claim allocation, the
    /// tax accrued to the fee pool, and the undistributed remainder, plus
    /// the commitment root claims will verify against.
    ///
    /// Operator-only, after the campaign window, exactly once; the figures
    /// must sum to the drift-measured total.
    pub fn settle_period(
        &self,
        caller: AccountId,
        id: PeriodId,
        claim_allocation: Amount,
        tax: Amount,
        undistributed: Amount,
        root: Hash256,
    ) -> Result<(), DistributionError> {
        self.require_operator(caller)?;
        let now = self.clock.now();
        let mut store = self.store.write();

        let period = store.period(id)?;
        let terms = period.immediate()?;
        if now < period.expire_time {
            return Err(DistributionError::NotEnded);
        }
        if terms.settlement.is_some() {
            return Err(DistributionError::AlreadyProcessed);
        }
        if root.is_zero() {
            return Err(DistributionError::ConfigIncomplete("commitment root"));
        }
        let parts = claim_allocation
            .checked_add(tax)
            .and_then(|s| s.checked_add(undistributed))
            .ok_or(DistributionError::ArithmeticOverflow)?;
        if parts != period.total {
            return Err(DistributionError::AccountingMismatch {
                parts,
                total: period.total,
            });
        }
        let asset = period.asset;

        let period = store.period_mut(id)?;
        period.commitment_root = root;
        period.immediate_mut()?.settlement = Some(Settlement {
            claim_allocation,
            tax,
            undistributed,
        });
        store.accrue_fee(asset, tax);
        info!(period = id, claim_allocation = %claim_allocation, tax = %tax, undistributed = %undistributed, "settled period");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Crediting
    // ------------------------------------------------------------------

    /// Credit a proven entitlement into a vested period, starting its
    /// vesting clock. Anyone may submit on behalf of `account`.
    pub fn vest(
        &self,
        account: AccountId,
        id: PeriodId,
        amount: Amount,
        proof: &[Hash256],
    ) -> Result<(), DistributionError> {
        let now = self.clock.now();
        let mut store = self.store.write();
        check_vest(&store, now, account, id, amount, proof)?;
        apply_vest(&mut store, now, account, id, amount)?;
        Ok(())
    }

    /// Credit entitlements across several vested periods atomically: any
    /// single failure (including a duplicate period id within the batch)
    /// rejects the whole batch.
    pub fn vest_many(
        &self,
        account: AccountId,
        ids: &[PeriodId],
        amounts: &[Amount],
        proofs: &[Vec<Hash256>],
    ) -> Result<(), DistributionError> {
        if ids.len() != amounts.len() || ids.len() != proofs.len() {
            return Err(DistributionError::MismatchedInputs);
        }
        let now = self.clock.now();
        let mut store = self.store.write();

        for (i, &id) in ids.iter().enumerate() {
            if ids[..i].contains(&id) {
                return Err(DistributionError::AlreadyProcessed);
            }
            check_vest(&store, now, account, id, amounts[i], &proofs[i])?;
        }
        for (i, &id) in ids.iter().enumerate() {
            apply_vest(&mut store, now, account, id, amounts[i])?;
        }
        Ok(())
    }

    /// Claim a proven entitlement from a settled immediate period; the
    /// payout transfers immediately. Returns the recipient's observed
    /// balance increase.
    pub fn claim(
        &self,
        account: AccountId,
        id: PeriodId,
        amount: Amount,
        proof: &[Hash256],
    ) -> Result<Amount, DistributionError> {
        let now = self.clock.now();
        let mut store = self.store.write();
        check_claim(&store, now, account, id, amount, proof)?;

        let asset = store.period(id)?.asset;
        let received = self.accountant.disburse(asset, account, amount, 1)?;
        apply_claim(&mut store, now, account, id, amount)?;
        Ok(received)
    }

    /// Claim from several settled periods atomically. All claims are
    /// validated before any value moves; any failure rejects the batch.
    /// Returns the total observed payout.
    pub fn claim_many(
        &self,
        account: AccountId,
        ids: &[PeriodId],
        amounts: &[Amount],
        proofs: &[Vec<Hash256>],
    ) -> Result<Amount, DistributionError> {
        if ids.len() != amounts.len() || ids.len() != proofs.len() {
            return Err(DistributionError::MismatchedInputs);
        }
        let now = self.clock.now();
        let mut store = self.store.write();

        for (i, &id) in ids.iter().enumerate() {
            if ids[..i].contains(&id) {
                return Err(DistributionError::AlreadyProcessed);
            }
            check_claim(&store, now, account, id, amounts[i], &proofs[i])?;
        }

        let mut received_total: Amount = 0;
        for (i, &id) in ids.iter().enumerate() {
            let asset = store.period(id)?.asset;
            received_total += self.accountant.disburse(asset, account, amounts[i], 1)?;
        }
        for (i, &id) in ids.iter().enumerate() {
            apply_claim(&mut store, now, account, id, amounts[i])?;
        }
        Ok(received_total)
    }

    // ------------------------------------------------------------------
    // Withdrawal and exit
    // ------------------------------------------------------------------

    /// Withdraw the currently unlocked, not-yet-withdrawn value of a vested
    /// entitlement. Returns the recipient's observed balance increase.
    pub fn withdraw(&self, account: AccountId, id: PeriodId) -> Result<Amount, DistributionError> {
        self.withdraw_many(account, &[id])
    }

    /// Withdraw across several vested periods atomically. A period with
    /// nothing withdrawable (including a duplicate id within the batch)
    /// fails the whole batch with `EmptyWithdraw`.
    pub fn withdraw_many(
        &self,
        account: AccountId,
        ids: &[PeriodId],
    ) -> Result<Amount, DistributionError> {
        let now = self.clock.now();
        let mut store = self.store.write();

        // Stage per-period withdrawals, accounting for earlier entries of
        // the same id within this batch.
        let mut staged: Vec<(PeriodId, AssetId, Amount)> = Vec::with_capacity(ids.len());
        for &id in ids {
            let period = store.period(id)?;
            let terms = period.vested()?;
            let ent = entitlement_for(&store, id, account)?;
            let already_staged: Amount = staged
                .iter()
                .filter(|(sid, _, _)| *sid == id)
                .map(|(_, _, w)| *w)
                .sum();
            let withdrawable = self.unlock.withdrawable(
                ent.amount,
                ent.withdrawn + already_staged,
                ent.vest_start,
                terms.vest_duration,
                now,
            )?;
            if withdrawable == 0 {
                return Err(DistributionError::EmptyWithdraw);
            }
            staged.push((id, period.asset, withdrawable));
        }

        let mut received_total: Amount = 0;
        for &(_, asset, amount) in &staged {
            received_total += self.accountant.disburse(asset, account, amount, 1)?;
        }
        for (id, _, amount) in staged {
            let ent = store
                .entitlement_mut(id, account)
                .ok_or(DistributionError::EmptyWithdraw)?;
            ent.withdrawn = ent
                .withdrawn
                .checked_add(amount)
                .ok_or(DistributionError::ArithmeticOverflow)?;
            debug!(period = id, account = %account, amount = %amount, "withdrew unlocked value");
        }
        Ok(received_total)
    }

    /// Exit a vested entitlement early: the unwithdrawn remainder is split
    /// into a penalty (kept for the operator) and an immediate payout.
    /// Terminal for the record.
    pub fn exit(&self, account: AccountId, id: PeriodId) -> Result<ExitQuote, DistributionError> {
        let now = self.clock.now();
        let mut store = self.store.write();

        let period = store.period(id)?;
        let terms = period.vested()?.clone();
        let asset = period.asset;
        let ent = entitlement_for(&store, id, account)?;

        let quote = self.unlock.exit_quote(&ent, &terms, now)?;
        if quote.penalty == 0 && quote.payout == 0 {
            return Err(DistributionError::EmptyWithdraw);
        }

        if quote.payout > 0 {
            self.accountant.disburse(asset, account, quote.payout, 1)?;
        }

        let ent = store
            .entitlement_mut(id, account)
            .ok_or(DistributionError::EmptyWithdraw)?;
        ent.penalty = ent
            .penalty
            .checked_add(quote.penalty)
            .ok_or(DistributionError::ArithmeticOverflow)?;
        ent.withdrawn = ent
            .withdrawn
            .checked_add(quote.payout)
            .ok_or(DistributionError::ArithmeticOverflow)?;
        ent.exited = true;
        let terms = store.period_mut(id)?.vested_mut()?;
        terms.penalty_total = terms
            .penalty_total
            .checked_add(quote.penalty)
            .ok_or(DistributionError::ArithmeticOverflow)?;
        debug!(period = id, account = %account, penalty = %quote.penalty, payout = %quote.payout, "exited early");
        Ok(quote)
    }

    // ------------------------------------------------------------------
    // Queries and configuration
    // ------------------------------------------------------------------

    pub fn period(&self, id: PeriodId) -> Result<DistributionPeriod, DistributionError> {
        self.store.read().period(id).cloned()
    }

    pub fn period_count(&self) -> u64 {
        self.store.read().period_count()
    }

    pub fn entitlement(&self, id: PeriodId, account: AccountId) -> Option<AccountEntitlement> {
        self.store.read().entitlement(id, account).cloned()
    }

    /// Tax accrued for `asset` and not yet swept.
    pub fn fee_pool(&self, asset: AssetId) -> Amount {
        self.store.read().fee_pool(asset)
    }

    pub fn engine_config(&self) -> EngineConfig {
        self.config.read().clone()
    }

    /// Replace the conversion configuration. Operator-only.
    pub fn set_config(
        &self,
        caller: AccountId,
        config: EngineConfig,
    ) -> Result<(), DistributionError> {
        self.require_operator(caller)?;
        config.validate()?;
        info!(pair_asset = %config.pair_asset, "updated engine config");
        *self.config.write() = config;
        Ok(())
    }
}

/// Shared window validation: a period must end after it starts and expire
/// in the future.
fn check_window(
    start: Timestamp,
    expire: Timestamp,
    now: Timestamp,
) -> Result<(), DistributionError> {
    if start >= expire || expire <= now {
        return Err(DistributionError::InvalidWindow { start, expire });
    }
    Ok(())
}

/// The entitlement record for `(id, account)`, or `EmptyWithdraw` if the
/// account was never credited. Terminal records reject further movement.
pub(crate) fn entitlement_for(
    store: &DistributionStore,
    id: PeriodId,
    account: AccountId,
) -> Result<AccountEntitlement, DistributionError> {
    let ent = store
        .entitlement(id, account)
        .cloned()
        .ok_or(DistributionError::EmptyWithdraw)?;
    if ent.converted {
        return Err(DistributionError::Converted);
    }
    if ent.exited {
        return Err(DistributionError::Exited);
    }
    Ok(ent)
}

fn check_vest(
    store: &DistributionStore,
    now: Timestamp,
    account: AccountId,
    id: PeriodId,
    amount: Amount,
    proof: &[Hash256],
) -> Result<(), DistributionError> {
    let period = store.period(id)?;
    period.vested()?;
    if amount == 0 {
        return Err(DistributionError::EmptyAmount);
    }
    if now < period.start_time {
        return Err(DistributionError::NotStarted);
    }
    if now >= period.expire_time {
        return Err(DistributionError::Expired);
    }
    if store.entitlement(id, account).is_some() {
        return Err(DistributionError::AlreadyProcessed);
    }
    if !commitment::verify(&period.commitment_root, &account, amount, proof) {
        return Err(DistributionError::ProofInvalid);
    }
    Ok(())
}

fn apply_vest(
    store: &mut DistributionStore,
    now: Timestamp,
    account: AccountId,
    id: PeriodId,
    amount: Amount,
) -> Result<(), DistributionError> {
    store.insert_entitlement(
        id,
        account,
        AccountEntitlement {
            amount,
            vest_start: now,
            ..Default::default()
        },
    )?;
    let terms = store.period_mut(id)?.vested_mut()?;
    terms.credited_total = terms
        .credited_total
        .checked_add(amount)
        .ok_or(DistributionError::ArithmeticOverflow)?;
    debug!(period = id, account = %account, amount = %amount, "credited vested entitlement");
    Ok(())
}

fn check_claim(
    store: &DistributionStore,
    now: Timestamp,
    account: AccountId,
    id: PeriodId,
    amount: Amount,
    proof: &[Hash256],
) -> Result<(), DistributionError> {
    let period = store.period(id)?;
    let terms = period.immediate()?;
    let settlement = terms.settlement.ok_or(DistributionError::NotStarted)?;
    if now >= period.expire_time.saturating_add(terms.reclaim_duration) {
        return Err(DistributionError::Expired);
    }
    if settlement.claim_allocation == 0 {
        return Err(DistributionError::NoReward);
    }
    if amount == 0 {
        return Err(DistributionError::EmptyAmount);
    }
    let drawn = terms
        .claimed_total
        .checked_add(amount)
        .ok_or(DistributionError::ArithmeticOverflow)?;
    if drawn > settlement.claim_allocation {
        return Err(DistributionError::AmountExceedsAllocation);
    }
    if store.entitlement(id, account).is_some() {
        return Err(DistributionError::AlreadyProcessed);
    }
    if !commitment::verify(&period.commitment_root, &account, amount, proof) {
        return Err(DistributionError::ProofInvalid);
    }
    Ok(())
}

fn apply_claim(
    store: &mut DistributionStore,
    now: Timestamp,
    account: AccountId,
    id: PeriodId,
    amount: Amount,
) -> Result<(), DistributionError> {
    store.insert_entitlement(
        id,
        account,
        AccountEntitlement {
            amount,
            withdrawn: amount,
            vest_start: now,
            ..Default::default()
        },
    )?;
    let terms = store.period_mut(id)?.immediate_mut()?;
    terms.claimed_total = terms
        .claimed_total
        .checked_add(amount)
        .ok_or(DistributionError::ArithmeticOverflow)?;
    debug!(period = id, account = %account, amount = %amount, "claimed immediate entitlement");
    Ok(())
}
