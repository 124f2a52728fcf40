//! Trait interfaces for the Sluice protocol.
//!
//! These traits define the contracts between crates and toward external
//! collaborators:
//! - [`AssetLedger`] — value transfers on the external ledger (host system implements)
//! - [`SwapRouter`] — asset exchange for conversions (host system implements)
//! - [`LockService`] — external time-lock deposits (host system implements)
//! - [`RoleOracle`] — operator role checks (host system implements)
//! - [`Clock`] — linearized time source (host system implements)
//! - [`UnlockCalculator`] — vesting math engine (sluice-vesting implements)
//!
//! The engine treats every `actual` amount returned by [`AssetLedger`] as an
//! upper-bound hint only; authoritative moved amounts are measured from
//! balance deltas (see the engine's drift accountant).

use crate::error::{CollaboratorError, DistributionError};
use crate::types::{
    AccountEntitlement, AccountId, Amount, AssetId, ExitQuote, LockState, Timestamp, VestedTerms,
};

/// Value movements against the external asset ledger.
///
/// The ledger side decides fees, rebasing, and transfer mechanics; the engine
/// only observes resulting balances. All transfers are between an external
/// holder and the engine's own treasury account.
pub trait AssetLedger: Send + Sync {
    /// Pull `nominal` units of `asset` from `from` into the engine treasury.
    /// Returns the amount the ledger reports as moved.
    fn transfer_in(
        &self,
        asset: AssetId,
        from: AccountId,
        nominal: Amount,
    ) -> Result<Amount, CollaboratorError>;

    /// Push `nominal` units of `asset` from the engine treasury to `to`.
    /// Returns the amount the ledger reports as moved.
    fn transfer_out(
        &self,
        asset: AssetId,
        to: AccountId,
        nominal: Amount,
    ) -> Result<Amount, CollaboratorError>;

    /// Current balance of `holder` in `asset`.
    fn balance_of(&self, asset: AssetId, holder: AccountId) -> Result<Amount, CollaboratorError>;
}

/// Asset exchange used by the conversion adapter.
pub trait SwapRouter: Send + Sync {
    /// Swap `amount_in` of `input_asset` for `output_asset`.
    ///
    /// Fails if the achievable output is below `min_out`.
    fn swap(
        &self,
        input_asset: AssetId,
        amount_in: Amount,
        output_asset: AssetId,
        min_out: Amount,
    ) -> Result<Amount, CollaboratorError>;
}

/// External time-lock holding converted value.
pub trait LockService: Send + Sync {
    /// Create a new lock for `owner`. Fails if one already exists.
    fn create_lock(
        &self,
        owner: AccountId,
        amount: Amount,
        unlock_time: Timestamp,
    ) -> Result<(), CollaboratorError>;

    /// Add `extra` to `owner`'s existing lock. `new_unlock_time = None`
    /// preserves the current unlock time.
    fn increase_lock(
        &self,
        owner: AccountId,
        extra: Amount,
        new_unlock_time: Option<Timestamp>,
    ) -> Result<(), CollaboratorError>;

    /// Current lock of `owner`, if any.
    fn lock_state_of(&self, owner: AccountId) -> Result<Option<LockState>, CollaboratorError>;
}

/// Role checks for operator-gated operations.
///
/// Provider rights are not a role: each period records its funder, and the
/// engine checks callers against that field directly.
pub trait RoleOracle: Send + Sync {
    fn is_operator(&self, caller: AccountId) -> bool;
}

/// Time source. All state transitions are linearized by the host system, so
/// a single monotone timestamp per call is sufficient.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Pure computation of linear unlock amounts and early-exit penalties.
///
/// All arithmetic is integer-only with truncating division; implementations
/// must never round up, since conservation invariants depend on exact
/// truncation. Implemented by the vesting engine (sluice-vesting).
pub trait UnlockCalculator: Send + Sync {
    /// Value unlocked at `now` for an entitlement credited at `vest_start`:
    /// `amount * min(now - vest_start, vest_duration) / vest_duration`.
    fn unlocked(
        &self,
        amount: Amount,
        vest_start: Timestamp,
        vest_duration: u64,
        now: Timestamp,
    ) -> Result<Amount, DistributionError>;

    /// Unlocked value not yet withdrawn, clamped to zero.
    ///
    /// Default implementation delegates to [`unlocked`](Self::unlocked).
    fn withdrawable(
        &self,
        amount: Amount,
        withdrawn: Amount,
        vest_start: Timestamp,
        vest_duration: u64,
        now: Timestamp,
    ) -> Result<Amount, DistributionError> {
        Ok(self
            .unlocked(amount, vest_start, vest_duration, now)?
            .saturating_sub(withdrawn))
    }

    /// Early-exit penalty rate in basis points at `now`.
    ///
    /// Decays linearly from `base + add` at credit time to `base` at full
    /// vest.
    fn penalty_rate_bps(
        &self,
        base_bps: u32,
        add_bps: u32,
        vest_start: Timestamp,
        vest_duration: u64,
        now: Timestamp,
    ) -> u32;

    /// Split the entitlement's unwithdrawn remainder into penalty and payout
    /// at the current penalty rate.
    fn exit_quote(
        &self,
        entitlement: &AccountEntitlement,
        terms: &VestedTerms,
        now: Timestamp,
    ) -> Result<ExitQuote, DistributionError>;
}
