//! Linear unlock engine implementing the [`UnlockCalculator`] trait.
//!
//! Unlocking is linear in elapsed time from the credit timestamp; the
//! early-exit penalty rate decays linearly from `base + add` basis points at
//! credit time down to `base` at full vest. All arithmetic is integer-only
//! with u128 intermediates and truncating division.

use sluice_core::constants::BPS;
use sluice_core::error::DistributionError;
use sluice_core::traits::UnlockCalculator;
use sluice_core::types::{
    mul_div, AccountEntitlement, Amount, ExitQuote, Timestamp, VestedTerms,
};

/// The production unlock calculator.
///
/// Implements [`UnlockCalculator`] with:
/// - Linear unlock: `amount * elapsed / vest_duration`
/// - Linearly decaying exit penalty over the unwithdrawn remainder
/// - Exact truncation toward zero at every division
#[derive(Debug, Clone, Default)]
pub struct LinearUnlock;

impl LinearUnlock {
    /// Create a new LinearUnlock.
    pub fn new() -> Self {
        Self
    }
}

/// Elapsed vesting time at `now`, capped at the full duration.
fn elapsed(vest_start: Timestamp, vest_duration: u64, now: Timestamp) -> u64 {
    now.saturating_sub(vest_start).min(vest_duration)
}

impl UnlockCalculator for LinearUnlock {
    fn unlocked(
        &self,
        amount: Amount,
        vest_start: Timestamp,
        vest_duration: u64,
        now: Timestamp,
    ) -> Result<Amount, DistributionError> {
        if vest_duration == 0 {
            // Degenerate schedule: everything unlocks at credit time.
            return Ok(amount);
        }
        let e = elapsed(vest_start, vest_duration, now);
        mul_div(amount, e as Amount, vest_duration as Amount)
    }

    fn penalty_rate_bps(
        &self,
        base_bps: u32,
        add_bps: u32,
        vest_start: Timestamp,
        vest_duration: u64,
        now: Timestamp,
    ) -> u32 {
        if vest_duration == 0 {
            return base_bps;
        }
        let left = vest_duration - elapsed(vest_start, vest_duration, now);
        base_bps + ((add_bps as u64 * left) / vest_duration) as u32
    }

    fn exit_quote(
        &self,
        entitlement: &AccountEntitlement,
        terms: &VestedTerms,
        now: Timestamp,
    ) -> Result<ExitQuote, DistributionError> {
        let remaining = entitlement.remaining();
        let rate = self.penalty_rate_bps(
            terms.penalty_base_bps,
            terms.penalty_add_bps,
            entitlement.vest_start,
            terms.vest_duration,
            now,
        );
        let penalty = mul_div(remaining, rate as Amount, BPS as Amount)?;
        let payout = remaining
            .checked_sub(penalty)
            .ok_or(DistributionError::ArithmeticOverflow)?;
        Ok(ExitQuote { penalty, payout })
    }
}
